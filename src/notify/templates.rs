//! HTML bodies for the shop's emails.

use rust_decimal::Decimal;

use super::EmailMessage;

pub fn confirmation_link(frontend_url: &str, user_id: i64, token: &str) -> String {
    format!("{}/email/confirm/{user_id}/{token}/", frontend_url.trim_end_matches('/'))
}

pub fn welcome(to: &str, last_name: &str, confirm_url: &str) -> EmailMessage {
    let name = escape(last_name);
    let url = escape(confirm_url);
    let body = format!(
        "<html><body>\
         <h2>Welcome to ShopIT, {name}!</h2>\
         <p>Thanks for signing up. Please confirm your email address to finish setting up your account.</p>\
         <p><a href=\"{url}\">Confirm my email</a></p>\
         <p>If the button does not work, paste this link into your browser:<br>{url}</p>\
         </body></html>"
    );
    EmailMessage::new(to, format!("Welcome to ShopIT, {last_name}"), body)
}

pub fn payment_confirmation(to: &str, order_id: i64, amount_paid: Decimal, currency: &str, receipt_url: Option<&str>) -> EmailMessage {
    let receipt = match receipt_url {
        Some(url) => format!("<p><a href=\"{}\">View your receipt</a></p>", escape(url)),
        None => String::new(),
    };
    let body = format!(
        "<html><body>\
         <h2>Thank you for your order!</h2>\
         <p>We have received your payment of {amount_paid} {} for order #{order_id}.</p>\
         {receipt}\
         <p>We will let you know when it is on its way.</p>\
         </body></html>",
        currency.to_uppercase()
    );
    EmailMessage::new(to, format!("Payment Confirmation - Order #{order_id}"), body)
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
