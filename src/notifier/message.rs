use crate::entities::Listing;

const SEPARATOR_WIDTH: usize = 40;
const INTRO: &str = "A new car has been added:";
const DISCLAIMER: &str = "This is an automated notification. Please do not reply to this email.";

/// Plain-text notification body for one listing.
///
/// Empty fields are left out. The link goes last, on its own line.
pub fn render_body(listing: &Listing) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut body = format!("{INTRO}\n\n{separator}\n\n");

    for (name, value) in listing.fields() {
        if value.is_empty() {
            continue;
        }
        let label = field_label(name);
        if name == "post_link" {
            body.push_str(&format!("{label}:\n{value}\n\n"));
        } else {
            body.push_str(&format!("{label}: {value}\n"));
        }
    }

    body.push_str(&format!("\n{separator}\n{DISCLAIMER}"));
    body
}

/// `doors_seats` -> `Doors Seats`
fn field_label(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
