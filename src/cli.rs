use clap::{Parser, Subcommand};

/// Notification worker: turns bus events into user notifications
#[derive(Parser)]
#[command(name = "notification-worker", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the worker and the read API
    Serve {
        /// Port for the read API (overrides NOTIF_API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Publish a sample event on the bus
    PublishTest {
        #[arg(long, default_value = "test-user-123")]
        owner: String,
        #[arg(long, default_value = "test-user-456")]
        trigger_user: String,
        #[arg(long, default_value = "John Doe")]
        username: String,
        /// Action code (1=like post … 6=follow)
        #[arg(long, default_value = "1")]
        action: i32,
        #[arg(long, default_value = "POST")]
        resource_type: String,
        #[arg(long, default_value = "test-post-789")]
        resource_id: String,
        #[arg(long, default_value = "This is a test notification")]
        excerpt: String,
        /// Subject to publish on; derived from the action when omitted
        #[arg(long)]
        subject: Option<String>,
    },

    /// Inspect stored notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// List the most recent notifications of a user
    List {
        #[arg(long)]
        recipient: String,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Mark a notification as read
    MarkRead {
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        action_key: String,
    },
}
