//! Seeds airdnd storage with sample data
//!
//! Creates an admin, a host and a guest, a handful of listings, one booking
//! and one review, all through the same services the REST layer uses.
//! Re-running against a seeded database is a no-op.
//! Run: cargo run --bin load_data [-- --db-path airdnd_data]

use serde_json::json;

use airdnd::config::Config;
use airdnd::context::Principal;
use airdnd::models::{Location, UserView};
use airdnd::services::booking::NewBooking;
use airdnd::services::home::NewHome;
use airdnd::services::review::NewReview;
use airdnd::services::user::NewUser;
use airdnd::services::Services;
use airdnd::storage::Storage;
use airdnd::telemetry;

fn seed_user(username: &str, first_name: &str, phone: &str, is_admin: bool) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: username.to_string(),
        first_name: first_name.to_string(),
        last_name: "Demo".to_string(),
        email: format!("{username}@airdnd.test"),
        phone: phone.to_string(),
        is_admin,
        ..NewUser::default()
    }
}

fn principal(user: &UserView) -> Principal {
    Principal::new(user.id, user.username.clone(), user.is_admin)
}

fn listing(title: &str, price: f64, city: &str, country: &str, amenities: &[&str]) -> NewHome {
    NewHome {
        title: title.to_string(),
        description: format!("{title} in {city}"),
        price: Some(price),
        capacity: Some(4),
        rooms: Some(2),
        beds: Some(2),
        bathrooms: Some(1),
        home_type: Some("apartment".to_string()),
        img_urls: vec![format!("https://img.airdnd.test/{}.jpg", title.to_lowercase().replace(' ', "-"))],
        rating: Some(4.5),
        number_of_raters: Some(12),
        location: Location {
            country: Some(country.to_string()),
            city: Some(city.to_string()),
            ..Location::default()
        },
        amenities: amenities.iter().map(|a| a.to_string()).collect(),
        highlights: Some(json!({ "selfCheckIn": true })),
        ..NewHome::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let _guard = telemetry::init(config.log_json);

    let services = Services::new(Storage::new(&config.db_path), config.bcrypt_cost);

    if services.users.get_by_username("admin").await?.is_some() {
        tracing::info!(db_path = %config.db_path, "already seeded, nothing to do");
        return Ok(());
    }

    let admin = services.users.add(seed_user("admin", "Ada", "050-000-0001", true)).await?;
    let host = services.users.add(seed_user("host", "Hila", "050-000-0002", false)).await?;
    let guest = services.users.add(seed_user("guest", "Gil", "050-000-0003", false)).await?;
    let host_principal = principal(&host);
    let guest_principal = principal(&guest);

    let samples = [
        listing("Beach Loft", 180.0, "Tel Aviv", "Israel", &["Wifi", "Kitchen", "Air conditioning"]),
        listing("Desert Cabin", 95.0, "Mitzpe Ramon", "Israel", &["Wifi", "Free parking"]),
        listing("Old Town Studio", 120.0, "Lisbon", "Portugal", &["Wifi", "Washer"]),
        listing("Canal House", 240.0, "Amsterdam", "Netherlands", &["Wifi", "Kitchen", "Pool"]),
    ];
    let mut homes = Vec::with_capacity(samples.len());
    for new in samples {
        homes.push(services.homes.add(&host_principal, new).await?);
    }
    tracing::info!(count = homes.len(), "homes added");

    let stay = &homes[0];
    let booking = services
        .bookings
        .add(
            &guest_principal,
            NewBooking {
                home_id: stay.id.to_string(),
                host_id: stay.host_id.to_string(),
                check_in: "2025-07-01".to_string(),
                check_out: "2025-07-05".to_string(),
                price_per_night: stay.price,
                discount: Some(0.1),
                tax: Some(25.0),
                ..NewBooking::default()
            },
        )
        .await?;

    services
        .reviews
        .add(
            &guest_principal,
            NewReview {
                home_id: stay.id.to_string(),
                rating: 5.0,
                comment: "Great location, would stay again".to_string(),
            },
        )
        .await?;

    tracing::info!(
        admin = %admin.id,
        host = %host.id,
        guest = %guest.id,
        booking = %booking.id,
        total = booking.total_price,
        "seed complete (passwords equal usernames)"
    );
    Ok(())
}
