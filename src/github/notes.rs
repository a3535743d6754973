//! Release notes rendering.

use crate::docker::IMAGE_PREFIX;
use crate::project::ServiceDescriptor;
use std::fmt::Write;

/// Heading every release body starts with
pub const NOTES_HEADER: &str = "# Docker Images\n\n";

/// Render the release body: one Docker Hub link per service, in descriptor order
pub fn render_release_notes(user: &str, services: &[ServiceDescriptor]) -> String {
    let mut notes = String::from(NOTES_HEADER);
    for service in services {
        let image = format!("{IMAGE_PREFIX}{}", service.image_name);
        // writing to a String cannot fail
        let _ = writeln!(notes, "[{image}](https://hub.docker.com/r/{user}/{image})");
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_services_in_order() {
        let services = vec![
            ServiceDescriptor::new("api", "api"),
            ServiceDescriptor::new("web", "web"),
        ];

        assert_eq!(
            render_release_notes("acme", &services),
            "# Docker Images\n\n\
             [imagemonkey-api](https://hub.docker.com/r/acme/imagemonkey-api)\n\
             [imagemonkey-web](https://hub.docker.com/r/acme/imagemonkey-web)\n"
        );
    }

    #[test]
    fn test_render_empty_set_is_header_only() {
        assert_eq!(render_release_notes("acme", &[]), "# Docker Images\n\n");
    }

    #[test]
    fn test_render_uses_image_name_not_key() {
        let notes = render_release_notes("acme", &[ServiceDescriptor::new("postgres", "db")]);
        assert!(notes.contains("[imagemonkey-db](https://hub.docker.com/r/acme/imagemonkey-db)"));
        assert!(!notes.contains("postgres"));
    }
}
