//! Demo data seeding command.
//!
//! Creates one account per role, a handful of stores across categories, and
//! enough ratings that the directory's computed sorts have something to
//! chew on. Safe to re-run: every insert skips rows that already exist.
//!
//! Demo credentials (password `Demo@1234` for all):
//! - `admin@storemark.dev` (admin)
//! - `user@storemark.dev` (user)
//! - `owner@storemark.dev` (store owner)

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;
use sqlx::PgPool;

use storemark_core::Role;

/// Password shared by all demo accounts.
const DEMO_PASSWORD: &str = "Demo@1234";

/// Errors from the seed command.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Password hashing error")]
    PasswordHash,
}

struct SeedUser {
    name: &'static str,
    email: &'static str,
    address: &'static str,
    role: Role,
}

struct SeedStore {
    name: &'static str,
    email: &'static str,
    address: &'static str,
    category: &'static str,
    /// Email of the owning account, if any.
    owner_email: Option<&'static str>,
}

const USERS: &[SeedUser] = &[
    SeedUser {
        name: "Demo Administrator",
        email: "admin@storemark.dev",
        address: "1 Admin Plaza",
        role: Role::Admin,
    },
    SeedUser {
        name: "Demo User",
        email: "user@storemark.dev",
        address: "2 Customer Lane",
        role: Role::User,
    },
    SeedUser {
        name: "Demo Store Owner",
        email: "owner@storemark.dev",
        address: "3 Merchant Row",
        role: Role::StoreOwner,
    },
];

const STORES: &[SeedStore] = &[
    SeedStore {
        name: "Corner Grocery",
        email: "hello@cornergrocery.example",
        address: "12 Market Street",
        category: "groceries",
        owner_email: Some("owner@storemark.dev"),
    },
    SeedStore {
        name: "Voltage Electronics",
        email: "contact@voltage.example",
        address: "48 Circuit Avenue",
        category: "electronics",
        owner_email: Some("owner@storemark.dev"),
    },
    SeedStore {
        name: "Page Turner Books",
        email: "info@pageturner.example",
        address: "7 Library Walk",
        category: "books",
        owner_email: None,
    },
    SeedStore {
        name: "Fresh Bites Cafe",
        email: "team@freshbites.example",
        address: "23 Orchard Road",
        category: "food",
        owner_email: None,
    },
];

/// Ratings given by the demo user: (store email, value, review).
const RATINGS: &[(&str, i32, &str)] = &[
    ("hello@cornergrocery.example", 5, "Always fresh produce."),
    ("contact@voltage.example", 3, "Decent range, slow service."),
    ("info@pageturner.example", 4, "Great staff picks shelf."),
];

/// Seed the database with demo data.
///
/// # Errors
///
/// Returns `SeedError` if the database URL is missing or any insert fails.
pub async fn run() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url =
        super::database_url().ok_or(SeedError::MissingEnvVar("API_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let password_hash = hash_password(DEMO_PASSWORD)?;

    for user in USERS {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, address, role) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(user.name)
        .bind(user.email)
        .bind(&password_hash)
        .bind(user.address)
        .bind(user.role.as_str())
        .execute(&pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(email = user.email, role = user.role.as_str(), "user seeded");
        }
    }

    for store in STORES {
        let result = sqlx::query(
            "INSERT INTO stores (name, email, address, category, owner_id) \
             VALUES ($1, $2, $3, $4, (SELECT id FROM users WHERE email = $5)) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(store.name)
        .bind(store.email)
        .bind(store.address)
        .bind(store.category)
        .bind(store.owner_email)
        .execute(&pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(store = store.name, "store seeded");
        }
    }

    for (store_email, value, review) in RATINGS {
        let result = sqlx::query(
            "INSERT INTO ratings (user_id, store_id, rating, review_text) \
             SELECT u.id, s.id, $1, $2 \
             FROM users u, stores s \
             WHERE u.email = 'user@storemark.dev' AND s.email = $3 \
             ON CONFLICT (user_id, store_id) DO NOTHING",
        )
        .bind(value)
        .bind(review)
        .bind(store_email)
        .execute(&pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(store = store_email, rating = value, "rating seeded");
        }
    }

    tracing::info!("Seed complete");
    Ok(())
}

/// Hash the demo password with Argon2id.
fn hash_password(password: &str) -> Result<String, SeedError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SeedError::PasswordHash)
}
