//! Command-line front end for the course review store.
//!
//! Each invocation opens the database once, runs a single command, commits
//! when the command wrote something, and disconnects.

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use coursereview::domain::{Course, CourseQuery, Rating, User};
use coursereview::infra::app_config::{self, AppConfig};
use coursereview::infra::db::Database;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_TITLE_LEN: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "coursereview")]
#[command(version)]
#[command(about = "Search courses and review them", long_about = None)]
struct Args {
    /// Database file (overrides COURSEREVIEW_DB_PATH and the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct Credentials {
    /// Username to act as
    #[arg(short, long)]
    user: String,

    /// Password for that user
    #[arg(short, long)]
    password: String,
}

#[derive(ClapArgs, Debug)]
struct CourseArgs {
    /// Subject mnemonic, e.g. CS
    subject: String,
    /// Four-digit course number
    number: u32,
    /// Course title
    title: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database tables if they do not exist
    Init,

    /// Create a new account
    Register(Credentials),

    /// Check a username and password
    Login(Credentials),

    /// Add a course to the catalog
    AddCourse(CourseArgs),

    /// List or search the catalog
    Courses {
        /// Exact subject
        #[arg(long)]
        subject: Option<String>,
        /// Exact course number
        #[arg(long)]
        number: Option<u32>,
        /// Title substring (case-insensitive)
        #[arg(long)]
        title: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Review a course, or update your existing review
    Review {
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        course: CourseArgs,
        /// Rating from 1 to 5
        #[arg(short, long)]
        rating: i64,
        /// Optional comment
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Delete your review of a course
    RemoveReview {
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        course: CourseArgs,
    },

    /// Show every review of a course
    Reviews(CourseArgs),

    /// Show your own reviews
    MyReviews(Credentials),

    /// Show or update the configuration file
    Config {
        /// Store this database path in the config file
        #[arg(long)]
        set_db: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = app_config::load_config();

    if let Commands::Config { set_db } = &args.command {
        return run_config(config, set_db.clone());
    }

    let path = app_config::resolve_database_path(args.db.clone(), &config);
    let db = Database::open_at(&path)
        .with_context(|| format!("Unable to open database at {}", path.display()))?;

    let result = run(&db, args.command);
    if let Err(err) = db.disconnect() {
        log::warn!("Failed to disconnect cleanly: {}", err);
    }
    result
}

fn run(db: &Database, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            println!(
                "Database ready at {}",
                db.path().map(|p| p.display().to_string()).unwrap_or_default()
            );
        }
        Commands::Register(credentials) => register(db, &credentials)?,
        Commands::Login(credentials) => {
            let user = login(db, &credentials)?;
            println!("Login successful. Welcome, {}.", user.username);
        }
        Commands::AddCourse(course) => add_course(db, &course)?,
        Commands::Courses {
            subject,
            number,
            title,
            json,
        } => {
            let query = CourseQuery {
                subject: subject.map(|s| s.trim().to_uppercase()),
                course_number: number,
                title,
            };
            let courses = db.course_repo().search_courses(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&courses)?);
            } else if courses.is_empty() {
                println!("No courses found.");
            } else {
                for course in courses {
                    println!("{course}");
                }
            }
        }
        Commands::Review {
            credentials,
            course,
            rating,
            comment,
        } => {
            let user = login(db, &credentials)?;
            let course = find_course(db, &course)?;
            let rating = Rating::new(rating)?;
            let comment = comment.filter(|c| !c.trim().is_empty());
            db.review_repo()
                .submit_review(&user, &course, rating, comment)
                .context("Unable to submit review")?;
            db.commit()?;
            println!("Review submitted successfully.");
        }
        Commands::RemoveReview {
            credentials,
            course,
        } => {
            let user = login(db, &credentials)?;
            let course = find_course(db, &course)?;
            db.review_repo()
                .remove_review(&course, &user)
                .context("Unable to delete review")?;
            db.commit()?;
            println!("Review deleted successfully.");
        }
        Commands::Reviews(course) => {
            let course = find_course(db, &course)?;
            let reviews = db.review_repo();
            let average = reviews.calculate_average_review_for_course(&course)?;
            println!("{} {}: {}", course.subject, course.course_number, course.title);
            match average {
                Some(avg) => println!("Average Rating: {avg:.2}"),
                None => println!("Average Rating: no reviews yet"),
            }
            for review in reviews.get_reviews_for_course(&course)? {
                println!("\n{review}");
            }
        }
        Commands::MyReviews(credentials) => {
            let user = login(db, &credentials)?;
            let mine = db.review_repo().get_reviews_from_user_with_courses(&user)?;
            if mine.is_empty() {
                println!("You have not reviewed any courses.");
            }
            for entry in mine {
                println!(
                    "{} {}: {} - your rating {}/{}",
                    entry.course.subject,
                    entry.course.course_number,
                    entry.course.title,
                    entry.review.rating,
                    Rating::MAX
                );
            }
        }
        Commands::Config { .. } => bail!("config is handled before the database is opened"),
    }
    Ok(())
}

fn run_config(mut config: AppConfig, set_db: Option<PathBuf>) -> Result<()> {
    if let Some(path) = set_db {
        config.database = Some(path);
        app_config::save_config(&config).context("Unable to write config file")?;
    }
    println!("Config file: {}", app_config::config_path().display());
    println!(
        "Database: {}",
        app_config::resolve_database_path(None, &config).display()
    );
    Ok(())
}

fn register(db: &Database, credentials: &Credentials) -> Result<()> {
    check_credentials_format(credentials)?;
    let users = db.user_repo();
    if users.user_exists(&credentials.user)? {
        bail!("User already exists. Please login.");
    }
    let mut user = User::new(credentials.user.clone());
    users
        .add_user(&mut user, &credentials.password)
        .context("Error while creating user")?;
    db.commit()?;
    println!("Registration successful. User created.");
    Ok(())
}

fn login(db: &Database, credentials: &Credentials) -> Result<User> {
    check_credentials_format(credentials)?;
    let users = db.user_repo();
    if !users.user_exists(&credentials.user)? {
        bail!("User does not exist. Please create an account.");
    }
    match users.verify_credentials(&credentials.user, &credentials.password)? {
        Some(user) => Ok(user),
        None => bail!("Invalid password. Please try again."),
    }
}

fn add_course(db: &Database, args: &CourseArgs) -> Result<()> {
    let subject = args.subject.trim().to_uppercase();
    let title = args.title.trim();
    check_course_format(&subject, args.number, title)?;

    let courses = db.course_repo();
    courses.ensure_course_absent(&subject, args.number, title)?;
    courses
        .add_course(&subject, args.number, title)
        .context("Unable to add course")?;
    db.commit()?;
    println!("Added {subject} {}: {title}", args.number);
    Ok(())
}

fn find_course(db: &Database, args: &CourseArgs) -> Result<Course> {
    let subject = args.subject.trim().to_uppercase();
    let courses = db.course_repo();
    let id = courses.get_course_id(&subject, args.number, args.title.trim())?;
    courses
        .get_course_by_id(id)?
        .with_context(|| format!("Course {id} disappeared"))
}

fn check_credentials_format(credentials: &Credentials) -> Result<()> {
    if credentials.user.is_empty() || credentials.password.is_empty() {
        bail!("Username or password cannot be empty.");
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters long.");
    }
    Ok(())
}

fn check_course_format(subject: &str, number: u32, title: &str) -> Result<()> {
    if !(2..=4).contains(&subject.len()) || !subject.chars().all(|c| c.is_ascii_uppercase()) {
        bail!("Subject must be 2 to 4 letters.");
    }
    if !(1000..=9999).contains(&number) {
        bail!("Course number must be 4 digits.");
    }
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        bail!("Title must be between 1 and {MAX_TITLE_LEN} characters.");
    }
    Ok(())
}
