//! Health check command - checks a running Watcher server.

use std::time::Duration;

use crate::cli::HealthArgs;

/// Run the health check command
pub async fn run(args: &HealthArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = args.url.trim_end_matches('/');
    let url = if base.ends_with("/health") {
        base.to_string()
    } else {
        format!("{base}/health")
    };
    let timeout = Duration::from_secs(args.timeout);

    let client = reqwest::Client::builder().timeout(timeout).build()?;

    match client.get(&url).send().await {
        Ok(response) => {
            let code = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("");
            if code.is_success() && status == "healthy" {
                println!("healthy: {body}");
                Ok(())
            } else if status.is_empty() {
                eprintln!("unhealthy: server returned HTTP status {code}");
                std::process::exit(1);
            } else {
                eprintln!("unhealthy: server reports {status}: {body}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("unhealthy: failed to connect to {url}: {e}");
            std::process::exit(1);
        }
    }
}
