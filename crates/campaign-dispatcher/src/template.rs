//! Message personalization.

use crate::model::Recipient;

const NAME_PLACEHOLDER: &str = "{{name}}";

/// Substitute `{{name}}` with the recipient's name, or nothing when unknown.
pub fn render(body: &str, recipient: &Recipient) -> String {
    body.replace(NAME_PLACEHOLDER, recipient.name.as_deref().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(name: Option<&str>) -> Recipient {
        Recipient {
            id: "c1".into(),
            phone: "600111222".into(),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_render_name() {
        assert_eq!(render("Hola {{name}}", &recipient(Some("Ana"))), "Hola Ana");
    }

    #[test]
    fn test_render_every_occurrence() {
        assert_eq!(
            render("{{name}}, {{name}}!", &recipient(Some("Ana"))),
            "Ana, Ana!"
        );
    }

    #[test]
    fn test_render_missing_name() {
        assert_eq!(render("Hola {{name}}", &recipient(None)), "Hola ");
    }

    #[test]
    fn test_render_leaves_other_placeholders() {
        assert_eq!(
            render("{{date}} {{name}}", &recipient(Some("Ana"))),
            "{{date}} Ana"
        );
    }
}
