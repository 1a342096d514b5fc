// catalog.rs -- Catalog metadata emission (collection XML)

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::component::Component;
use crate::config::FormatVersion;
use crate::exception::GeneratorError;

/// Escape a string for embedding in XML text content or attributes.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize one component to collection XML.
fn component_xml(cpt: &Component) -> String {
    let mut xml = String::new();
    xml.push_str(&format!("  <component type=\"{}\">\n", cpt.kind.as_str()));
    xml.push_str(&format!("    <id>{}</id>\n", xml_escape(&cpt.id)));

    for (locale, value) in sorted_localized(cpt.names()) {
        xml.push_str(&localized_tag("name", &locale, &xml_escape(&value)));
    }
    for (locale, value) in sorted_localized(cpt.summaries()) {
        xml.push_str(&localized_tag("summary", &locale, &xml_escape(&value)));
    }
    // Description values already carry escaped <p> paragraph markup
    for (locale, value) in sorted_localized(cpt.descriptions()) {
        xml.push_str(&localized_tag("description", &locale, &value));
    }

    if !cpt.categories().is_empty() {
        xml.push_str("    <categories>\n");
        for category in cpt.categories() {
            xml.push_str(&format!(
                "      <category>{}</category>\n",
                xml_escape(category)
            ));
        }
        xml.push_str("    </categories>\n");
    }

    let keyword_locales = {
        let mut locales: Vec<&String> = cpt.keyword_map().keys().collect();
        locales.sort();
        locales
    };
    for locale in keyword_locales {
        let words = &cpt.keyword_map()[locale];
        if words.is_empty() {
            continue;
        }
        let attr = lang_attr(locale);
        xml.push_str(&format!("    <keywords{}>\n", attr));
        for word in words {
            xml.push_str(&format!(
                "      <keyword>{}</keyword>\n",
                xml_escape(word)
            ));
        }
        xml.push_str("    </keywords>\n");
    }

    if let Some(mimetypes) = cpt.provided("mimetype") {
        xml.push_str("    <provides>\n");
        for mime in mimetypes {
            xml.push_str(&format!(
                "      <mediatype>{}</mediatype>\n",
                xml_escape(mime)
            ));
        }
        xml.push_str("    </provides>\n");
    }

    for icon in cpt.icons() {
        xml.push_str(&format!(
            "    <icon type=\"{}\" width=\"{}\" height=\"{}\">{}</icon>\n",
            xml_escape(&icon.kind),
            icon.width,
            icon.height,
            xml_escape(&icon.name)
        ));
    }

    xml.push_str("  </component>\n");
    xml
}

fn lang_attr(locale: &str) -> String {
    if locale == "C" {
        String::new()
    } else {
        format!(" xml:lang=\"{}\"", xml_escape(locale))
    }
}

fn localized_tag(tag: &str, locale: &str, body: &str) -> String {
    format!("    <{}{}>{}</{}>\n", tag, lang_attr(locale), body, tag)
}

// "C" first, then remaining locales alphabetically
fn sorted_localized(
    map: &std::collections::HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> =
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    entries.sort_by(|a, b| match (a.0.as_str(), b.0.as_str()) {
        ("C", "C") => std::cmp::Ordering::Equal,
        ("C", _) => std::cmp::Ordering::Less,
        (_, "C") => std::cmp::Ordering::Greater,
        (a, b) => a.cmp(b),
    });
    entries
}

/// Render the full collection document for one slice.
pub fn collection_xml(
    components: &[Component],
    origin: &str,
    format_version: FormatVersion,
) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<components version=\"{}\" origin=\"{}\">\n",
        format_version.as_str(),
        xml_escape(origin)
    ));
    for cpt in components {
        xml.push_str(&component_xml(cpt));
    }
    xml.push_str("</components>\n");
    xml
}

/// Write the gzip-compressed collection document for one slice and return
/// its path.
pub fn write_catalog(
    components: &[Component],
    suite: &str,
    section: &str,
    arch: &str,
    export_dir: &Path,
    format_version: FormatVersion,
) -> Result<PathBuf, GeneratorError> {
    let dir = export_dir.join(suite).join(section);
    fs::create_dir_all(&dir)
        .map_err(|e| GeneratorError::new(&format!("Failed to create export dir: {}", e)))?;

    let origin = format!("{}-{}", suite, section);
    let xml = collection_xml(components, &origin, format_version);

    let path = dir.join(format!("Components-{}.xml.gz", arch));
    let file = File::create(&path)
        .map_err(|e| GeneratorError::new(&format!("Failed to create catalog file: {}", e)))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .and_then(|_| encoder.finish().map(|_| ()))
        .map_err(|e| GeneratorError::new(&format!("Failed to write catalog: {}", e)))?;

    Ok(path)
}
