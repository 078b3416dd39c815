//! Terminal output: listing tables, detail cards and countdown badges

use colored::{ColoredString, Colorize};
use grabgrub_core::application::{AppState, CountdownFrame};
use grabgrub_core::domain::{Deal, Listing, Post, Urgency};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct PostRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Pickup")]
    pickup: String,
    #[tabled(rename = "Time left")]
    time_left: String,
}

#[derive(Tabled)]
struct DealRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Store")]
    store: String,
    #[tabled(rename = "Discount")]
    discount: String,
    #[tabled(rename = "Expires")]
    expires: String,
}

pub fn badge(frame: &CountdownFrame) -> ColoredString {
    let label = frame.label();
    match frame.urgency {
        Urgency::Normal => label.green(),
        Urgency::Final => label.red().bold(),
        Urgency::Expired => label.dimmed(),
    }
}

fn frame_for<T: Listing>(state: &AppState, listing: &T) -> CountdownFrame {
    state.countdown(&listing.end_date_time()).frame()
}

pub fn post_table(state: &AppState, posts: &[Post]) -> String {
    let rows: Vec<PostRow> = posts
        .iter()
        .map(|post| PostRow {
            id: post.id,
            title: post.title.clone(),
            location: post.location.clone(),
            pickup: post.pickup_window.clone(),
            time_left: frame_for(state, post).label(),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn deal_table(deals: &[Deal]) -> String {
    let rows: Vec<DealRow> = deals
        .iter()
        .map(|deal| DealRow {
            id: deal.id,
            title: deal.title.clone(),
            store: deal.store.clone(),
            discount: deal.discount.clone(),
            expires: if deal.expiration_date.is_empty() {
                "-".to_string()
            } else {
                deal.expiration_date.clone()
            },
        })
        .collect();
    Table::new(rows).to_string()
}

fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("  {} {}", format!("{}:", label).bold(), value);
    }
}

pub fn post_card(state: &AppState, post: &Post, contact: Option<&str>) {
    println!("{}", post.title.cyan().bold());
    field("Location", &post.location);
    field("Pickup", &post.pickup_window);
    println!("  {} {}", "Status:".bold(), badge(&frame_for(state, post)));
    field("Note", &post.note);
    field("Contact", contact.unwrap_or_default());
    if !post.images.is_empty() {
        field("Images", &post.images.len().to_string());
    }
}

pub fn deal_card(deal: &Deal, contact: Option<&str>) {
    println!("{}", deal.title.cyan().bold());
    field("Store", &deal.store);
    field("Location", &deal.location);
    field("Discount", &deal.discount);
    field("Expires", &deal.expiration_date);
    field("Details", &deal.summary());
    field("Contact", contact.unwrap_or_default());
    if !deal.images.is_empty() {
        field("Images", &deal.images.len().to_string());
    }
}
