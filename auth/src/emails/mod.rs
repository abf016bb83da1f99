//! HTML bodies of the transactional emails the service sends.

/// Registration email asking the user to follow the verification link.
pub fn registration_html(name: &str, app_name: &str, verification_url: &str) -> String {
    format!(
        r#"
<div>
    <p>Hello {name}</p>
    <p>Thank you for registring in {app_name}</p>
    <p><a href="{verification_url}">Click here to verify your email and account</a></p>
</div>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_email_embeds_name_and_link() {
        let html = registration_html("Ada", "authbridge", "https://app.example.com/verify?id=1");
        assert!(html.contains("Hello Ada"));
        assert!(html.contains("authbridge"));
        assert!(html.contains(r#"href="https://app.example.com/verify?id=1""#));
    }
}
