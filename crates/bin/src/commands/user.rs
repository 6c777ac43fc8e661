//! User directory commands.

use std::path::Path;

use watcher::{
    config::Config,
    credentials::{CredentialValidator, NewUser, crypto, schema},
    registry::ConnectionRegistry,
};

use crate::cli::AddUserArgs;

fn read_new_password() -> Result<String, Box<dyn std::error::Error>> {
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err("password cannot be empty".into());
    }
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        return Err("passwords do not match".into());
    }
    Ok(password)
}

/// Print the Argon2 hash of a password read from the terminal.
pub fn hash_password() -> Result<(), Box<dyn std::error::Error>> {
    let password = read_new_password()?;
    println!("{}", crypto::hash_password(password)?);
    Ok(())
}

/// Insert a user into the configured auth database.
pub async fn add_user(config_path: &Path, args: &AddUserArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(config_path)?;
    super::init_tracing(&config.logging.level);

    let password = read_new_password()?;

    // Only the auth connection is needed here
    let auth_db = config.auth.database.clone();
    let registry = ConnectionRegistry::initialize(
        config.connections().into_iter().filter(|c| c.name == auth_db),
        config.timeouts.connect(),
        config.timeouts.operation(),
    )
    .await?;
    let users = registry.get(&auth_db)?;

    let user = NewUser {
        user_id: args
            .user_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        nip: args.nip.clone(),
        name: args.name.clone(),
        role: args.role.clone(),
        title: args.title.clone(),
        department_id: args.department_id.clone(),
    };

    let result = async {
        schema::ensure_users_table(&users).await?;
        CredentialValidator::new(users)
            .create_user(&user, &password)
            .await
    }
    .await;
    registry.close().await;
    result?;

    println!("Created user {} (NIP {})", user.user_id, user.nip);
    Ok(())
}
