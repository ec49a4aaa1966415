//! Manifest document rendering.
//!
//! Two small XML descriptors go into every bundle: `code/app.xml` carrying
//! the byte-swapped title id, and `meta/meta.xml` carrying display names and
//! the second-screen flag. Templates are embedded at compile time and
//! rendered strictly: any unbound placeholder fails the render instead of
//! producing a silently incomplete document.

use std::fmt;

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior};

/// Result type for manifest rendering.
pub type ManifestResult<T> = Result<T, ManifestError>;

const APP_XML_TEMPLATE: &str = include_str!("../../templates/app.xml.j2");
const META_XML_TEMPLATE: &str = include_str!("../../templates/meta.xml.j2");

/// Errors that can occur while rendering a manifest document.
#[derive(Debug)]
pub enum ManifestError {
    /// Template parsing or rendering failed, including unbound placeholders.
    Render(minijinja::Error),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestError::Render(e) => write!(f, "failed to render manifest: {}", e),
        }
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManifestError::Render(e) => Some(e),
        }
    }
}

impl From<minijinja::Error> for ManifestError {
    fn from(e: minijinja::Error) -> Self {
        ManifestError::Render(e)
    }
}

/// Build the strict template environment shared by both manifests.
fn environment() -> ManifestResult<Environment<'static>> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.add_template("app.xml", APP_XML_TEMPLATE)?;
    env.add_template("meta.xml", META_XML_TEMPLATE)?;
    Ok(env)
}

/// Render the app descriptor for `code/app.xml`.
pub fn render_app_xml(title_id_hex: &str) -> ManifestResult<String> {
    let env = environment()?;
    let template = env.get_template("app.xml")?;
    Ok(template.render(context! { title_id_hex })?)
}

/// Render the meta descriptor for `meta/meta.xml`.
///
/// `short_name` falls back to `long_name` when absent.
pub fn render_meta_xml(
    title_id_text: &str,
    title_id_hex: &str,
    drc_use: u32,
    long_name: &str,
    short_name: Option<&str>,
) -> ManifestResult<String> {
    let short_name = short_name.unwrap_or(long_name);
    let env = environment()?;
    let template = env.get_template("meta.xml")?;
    Ok(template.render(context! {
        title_id_text,
        title_id_hex,
        drc_use,
        long_name,
        short_name,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_app_xml_carries_title_id_hex() {
        let xml = render_app_xml("47414C45").unwrap();
        assert!(xml.contains("<title_id type=\"hexBinary\" length=\"8\">0005000247414C45</title_id>"));
    }

    #[test]
    fn test_render_meta_xml_carries_identity_and_flags() {
        let xml = render_meta_xml("GALE", "47414C45", 65537, "Example Game", None).unwrap();
        assert!(xml.contains("WUP-N-GALE"));
        assert!(xml.contains("0005000247414C45"));
        assert!(xml.contains("<drc_use type=\"unsignedInt\" length=\"4\">65537</drc_use>"));
        assert!(xml.contains("<longname_en type=\"string\" length=\"512\">Example Game</longname_en>"));
        assert!(xml.contains("<shortname_en type=\"string\" length=\"256\">Example Game</shortname_en>"));
    }

    #[test]
    fn test_render_meta_xml_short_name_override() {
        let xml = render_meta_xml("GALE", "47414C45", 1, "The Long Example Name", Some("Example"))
            .unwrap();
        assert!(xml.contains("<longname_en type=\"string\" length=\"512\">The Long Example Name</longname_en>"));
        assert!(xml.contains("<shortname_en type=\"string\" length=\"256\">Example</shortname_en>"));
    }

    #[test]
    fn test_render_meta_xml_escapes_markup() {
        let xml = render_meta_xml("GALE", "47414C45", 1, "Fish & Chips", None).unwrap();
        assert!(xml.contains("Fish &amp; Chips"));
    }

    #[test]
    fn test_unbound_placeholder_fails_render() {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template("strict.xml", "<name>{{ missing }}</name>")
            .unwrap();
        let template = env.get_template("strict.xml").unwrap();

        let result = template.render(context! {});
        assert!(result.is_err());
    }
}
