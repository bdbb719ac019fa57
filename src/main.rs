use std::{fs::File, io, process::exit};

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use yatube::{accounts, config::AppConfig, error::Error, forms::Credentials, store};

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    #[clap(long, env = "YATUBE_DB", default_value = "yatube.db")]
    /// Database path
    sqlite: String,

    #[clap(long)]
    /// Run migrations and exit
    migrate_only: bool,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the site (default)
    Serve,
    /// Register a user
    CreateUser {
        username: String,
        /// Asked for interactively when omitted
        #[clap(long)]
        password: Option<String>,
    },
    /// Delete a user with their posts, comments and follows
    DeleteUser { username: String },
    /// Add a group posts can be published in
    CreateGroup {
        title: String,
        slug: String,
        #[clap(long, default_value = "")]
        description: String,
    },
    /// Delete a group; its posts are kept
    DeleteGroup { slug: String },
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    {
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&args.sqlite);
        match file {
            Ok(_) => log::info!("Created database {}", args.sqlite),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                log::error!("Failed to open file {}: {e}", args.sqlite);
                exit(1)
            }
        }
    }

    let db = Database::connect(format!("sqlite://{}", args.sqlite)).await?;
    Migrator::up(&db, None).await?;

    if args.migrate_only {
        exit(0);
    }

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let _ = yatube::build(rocket::Config::figment(), db)?.launch().await?;
        }
        command => manage(&db, command).await?,
    }

    Ok(())
}

async fn manage(
    db: &DatabaseConnection,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let config: AppConfig = rocket::Config::figment().extract()?;

    match command {
        Command::Serve => {}
        Command::CreateUser { username, password } => {
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password(format!("Password for {username}: "))?,
            };
            let credentials = Credentials { username, password };
            match accounts::create_user(db, &credentials, config.password_cost).await {
                Ok(user) => println!("{} api token: {}", user.username, user.api_token),
                Err(Error::Invalid(errors)) => {
                    eprintln!("{}", serde_json::to_string_pretty(&errors)?);
                    exit(1)
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::DeleteUser { username } => {
            let Some(user) = accounts::find_by_username(db, &username).await? else {
                eprintln!("No user named {username}");
                exit(1)
            };
            store::delete_user(db, user).await?;
        }
        Command::CreateGroup {
            title,
            slug,
            description,
        } => match store::create_group(db, &title, &slug, &description).await {
            Ok(group) => println!("Created group {} at /group/{}/", group, group.slug),
            Err(Error::Invalid(errors)) => {
                eprintln!("{}", serde_json::to_string_pretty(&errors)?);
                exit(1)
            }
            Err(e) => return Err(e.into()),
        },
        Command::DeleteGroup { slug } => {
            let group = match store::get_group_by_slug(db, &slug).await {
                Ok(group) => group,
                Err(Error::NotFound) => {
                    eprintln!("No group with slug {slug}");
                    exit(1)
                }
                Err(e) => return Err(e.into()),
            };
            store::delete_group(db, group).await?;
            log::info!("Deleted group {slug}");
        }
    }

    Ok(())
}
