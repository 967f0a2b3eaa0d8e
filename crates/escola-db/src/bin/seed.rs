//! # Seed Data Generator
//!
//! Populates the database with sample classes and students for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./escola_dev.db
//! cargo run -p escola-db --bin seed
//!
//! # Specify database path
//! cargo run -p escola-db --bin seed -- --db ./data/escola.db
//!
//! # Use settings from a config file (escola.toml)
//! cargo run -p escola-db --bin seed -- --config ./escola.toml
//! ```
//!
//! ## Generated Data
//! - Three classes: 1º, 2º and 3º Ano A
//! - Five students, each enrolled through the enrollment engine so the
//!   capacity rules apply exactly as they do at runtime

use std::env;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, Utc};
use escola_core::{NewClass, NewStudent, StudentStatus};
use escola_db::{Database, DbConfig, SchoolConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, capacity)
const CLASSES: &[(&str, i64)] = &[("1º Ano A", 30), ("2º Ano A", 28), ("3º Ano A", 25)];

/// (name, (years before the current year, month, day), email, class index into CLASSES)
const STUDENTS: &[(&str, (i32, u32, u32), &str, usize)] = &[
    ("Ana Silva", (16, 3, 15), "ana.silva@escola.edu.br", 0),
    ("Bruno Santos", (17, 7, 22), "bruno.santos@escola.edu.br", 0),
    ("Carla Costa", (18, 1, 10), "carla.costa@escola.edu.br", 1),
    ("Diego Oliveira", (19, 11, 5), "diego.oliveira@escola.edu.br", 1),
    ("Elena Lima", (20, 9, 18), "elena.lima@escola.edu.br", 2),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,escola=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Escola Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./escola_dev.db)");
                println!("  -c, --config <PATH>    Load settings from an escola.toml file");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            let mut settings = SchoolConfig::load(Some(path))?;
            if let Some(db) = db_path {
                settings.database.path = PathBuf::from(db);
            }
            DbConfig::from(&settings)
        }
        None => DbConfig::new(db_path.unwrap_or_else(|| String::from("./escola_dev.db"))),
    };

    println!("🌱 Escola Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.classes().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} classes", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating classes...");

    let mut class_ids = Vec::with_capacity(CLASSES.len());
    for (name, capacity) in CLASSES {
        let class = db
            .classes()
            .create(&NewClass {
                name: name.to_string(),
                capacity: *capacity,
            })
            .await?;
        println!("  {} (capacity {})", class.name, class.capacity);
        class_ids.push(class.id);
    }

    println!();
    println!("Creating and enrolling students...");

    let this_year = Utc::now().year();
    for (name, (years_back, month, day), email, class_idx) in STUDENTS {
        let Some(birth_date) = NaiveDate::from_ymd_opt(this_year - years_back, *month, *day) else {
            eprintln!("Invalid birth date for {}", name);
            continue;
        };

        let student = match db
            .students()
            .create(&NewStudent {
                name: name.to_string(),
                birth_date,
                email: Some(email.to_string()),
                status: Some(StudentStatus::Active),
            })
            .await
        {
            Ok(student) => student,
            Err(e) => {
                eprintln!("Failed to create {}: {}", name, e);
                continue;
            }
        };

        match db.enrollment().enroll(&student.id, &class_ids[*class_idx]).await {
            Ok(receipt) => println!("  {} → {}", receipt.student_name, receipt.class_name),
            Err(e) => eprintln!("Failed to enroll {}: {}", name, e),
        }
    }

    let stats = db.roster().system_statistics().await?;
    info!(
        students = stats.total_students,
        classes = stats.total_classes,
        "Seed finished"
    );

    println!();
    println!("Occupancy:");
    for line in &stats.per_class {
        println!(
            "  {:<10} {:>2}/{:<2} ({:.1}%)",
            line.class_name, line.occupancy, line.capacity, line.occupancy_percent
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
