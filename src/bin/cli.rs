use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use std::fs;

const TOKEN_FILE: &str = ".airdnd_token";

#[derive(Parser)]
#[command(name = "airdnd-cli")]
#[command(about = "CLI for the airdnd REST API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, env = "AIRDND_URL", default_value = "http://localhost:3030")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(short, long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Search listings. Filters map one-to-one onto the query string.
    Homes {
        #[arg(short, long)]
        txt: Option<String>,
        #[arg(long = "type")]
        home_type: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        capacity: Option<u32>,
        #[arg(short, long = "amenity")]
        amenities: Vec<String>,
        #[arg(long)]
        sort_field: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        page_idx: Option<usize>,
    },
    Home {
        #[arg(short, long)]
        id: String,
    },
    AddHome {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value_t = 0.0)]
        price: f64,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(short, long = "amenity")]
        amenities: Vec<String>,
    },
    RemoveHome {
        #[arg(short, long)]
        id: String,
    },
    Book {
        #[arg(long)]
        home_id: String,
        #[arg(long)]
        host_id: String,
        #[arg(long)]
        check_in: String,
        #[arg(long)]
        check_out: String,
        #[arg(long)]
        price_per_night: f64,
        #[arg(long)]
        discount: Option<f64>,
        #[arg(long)]
        tax: Option<f64>,
    },
    Bookings {
        #[arg(long)]
        home_id: Option<String>,
        #[arg(long)]
        guest_id: Option<String>,
        #[arg(long)]
        check_in: Option<String>,
        #[arg(long)]
        check_out: Option<String>,
    },
    Review {
        #[arg(long)]
        home_id: String,
        #[arg(short, long)]
        rating: f64,
        #[arg(short, long, default_value = "")]
        comment: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

fn authed(req: RequestBuilder) -> RequestBuilder {
    let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
    req.bearer_auth(token.trim())
}

async fn print_response(res: Response) -> Result<(), reqwest::Error> {
    println!("{} {}", res.status(), res.text().await?);
    Ok(())
}

fn push(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<impl ToString>) {
    if let Some(value) = value {
        query.push((key, value.to_string()));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Signup { username, password, first_name, last_name, email, phone } => {
            let res = client.post(format!("{api}/auth/signup"))
                .json(&json!({
                    "username": username,
                    "password": password,
                    "firstName": first_name,
                    "lastName": last_name,
                    "email": email,
                    "phone": phone,
                }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Signed up. Token saved to {TOKEN_FILE}");
            } else {
                print_response(res).await?;
            }
        }
        Commands::Login { username, password } => {
            let res = client.post(format!("{api}/auth/login"))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Logged in. Token saved to {TOKEN_FILE}");
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::Homes {
            txt,
            home_type,
            city,
            country,
            min_price,
            max_price,
            capacity,
            amenities,
            sort_field,
            desc,
            page_idx,
        } => {
            let mut query = Vec::new();
            push(&mut query, "txt", txt);
            push(&mut query, "type", home_type);
            push(&mut query, "city", city);
            push(&mut query, "country", country);
            push(&mut query, "minPrice", min_price);
            push(&mut query, "maxPrice", max_price);
            push(&mut query, "capacity", capacity);
            push(&mut query, "sortField", sort_field);
            push(&mut query, "pageIdx", page_idx);
            if desc {
                query.push(("sortDir", "-1".to_string()));
            }
            for amenity in amenities {
                query.push(("amenities[]", amenity));
            }
            let res = client.get(format!("{api}/home")).query(&query).send().await?;
            print_response(res).await?;
        }
        Commands::Home { id } => {
            let res = client.get(format!("{api}/home/{id}")).send().await?;
            print_response(res).await?;
        }
        Commands::AddHome { title, price, description, city, country, amenities } => {
            let res = authed(client.post(format!("{api}/home")))
                .json(&json!({
                    "title": title,
                    "price": price,
                    "description": description,
                    "location": { "city": city, "country": country },
                    "amenities": amenities,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::RemoveHome { id } => {
            let res = authed(client.delete(format!("{api}/home/{id}"))).send().await?;
            print_response(res).await?;
        }
        Commands::Book { home_id, host_id, check_in, check_out, price_per_night, discount, tax } => {
            let res = authed(client.post(format!("{api}/booking")))
                .json(&json!({
                    "home_id": home_id,
                    "host_id": host_id,
                    "checkIn": check_in,
                    "checkOut": check_out,
                    "pricePerNight": price_per_night,
                    "discount": discount,
                    "tax": tax,
                }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Bookings { home_id, guest_id, check_in, check_out } => {
            let mut query = Vec::new();
            push(&mut query, "homeId", home_id);
            push(&mut query, "guestId", guest_id);
            push(&mut query, "checkIn", check_in);
            push(&mut query, "checkOut", check_out);
            let res = client.get(format!("{api}/booking")).query(&query).send().await?;
            print_response(res).await?;
        }
        Commands::Review { home_id, rating, comment } => {
            let res = authed(client.post(format!("{api}/review")))
                .json(&json!({ "home_id": home_id, "rating": rating, "comment": comment }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Logout => {
            let _ = client.post(format!("{api}/auth/logout")).send().await;
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
