// desktop.rs -- Desktop-entry parser front-end

use std::collections::HashMap;

use crate::component::{Component, Icon};
use crate::config::FormatVersion;
use crate::locale;
use crate::result::{GeneratorResult, HintSubject};

/// Category names that carry no catalog value and are always dropped.
const CATEGORY_BLACKLIST: [&str; 6] = ["GTK", "Qt", "GNOME", "KDE", "GUI", "Application"];

/// Top-level domain tokens recognized when deciding whether a desktop-file
/// basename is a reverse-DNS component id.
const KNOWN_TLDS: [&str; 16] = [
    "com", "net", "org", "edu", "gov", "int", "mil", "io", "de", "uk", "co", "eu", "fr", "app",
    "dev", "im",
];

/// Registered freedesktop.org menu categories accepted into a component.
const CANONICAL_CATEGORIES: [&str; 99] = [
    // Main categories
    "AudioVideo",
    "Audio",
    "Video",
    "Development",
    "Education",
    "Game",
    "Graphics",
    "Network",
    "Office",
    "Science",
    "Settings",
    "System",
    "Utility",
    // Additional categories
    "Building",
    "Debugger",
    "IDE",
    "Profiling",
    "RevisionControl",
    "Translation",
    "Calendar",
    "ContactManagement",
    "Database",
    "Dictionary",
    "Chart",
    "Email",
    "Finance",
    "FlowChart",
    "ProjectManagement",
    "Presentation",
    "Spreadsheet",
    "WordProcessor",
    "2DGraphics",
    "VectorGraphics",
    "RasterGraphics",
    "3DGraphics",
    "Scanning",
    "OCR",
    "Photography",
    "Publishing",
    "Viewer",
    "TextTools",
    "TextEditor",
    "DesktopSettings",
    "HardwareSettings",
    "Printing",
    "PackageManager",
    "Dialup",
    "InstantMessaging",
    "Chat",
    "IRCClient",
    "Feed",
    "FileTransfer",
    "HamRadio",
    "News",
    "P2P",
    "RemoteAccess",
    "Telephony",
    "VideoConference",
    "WebBrowser",
    "WebDevelopment",
    "Midi",
    "Mixer",
    "Sequencer",
    "Tuner",
    "TV",
    "AudioVideoEditing",
    "Player",
    "Recorder",
    "DiscBurning",
    "ActionGame",
    "AdventureGame",
    "ArcadeGame",
    "BoardGame",
    "BlocksGame",
    "CardGame",
    "KidsGame",
    "LogicGame",
    "RolePlaying",
    "Shooter",
    "Simulation",
    "SportsGame",
    "StrategyGame",
    "Astronomy",
    "Biology",
    "Chemistry",
    "ComputerScience",
    "Electronics",
    "Engineering",
    "Geography",
    "Math",
    "Physics",
    "Archiving",
    "Compression",
    "Emulator",
    "FileManager",
    "FileTools",
    "Monitor",
    "Security",
    "Accessibility",
];

/// Backend hook supplying extra translations for desktop-entry keys, e.g.
/// from distribution language packs. Explicitly decoded locales always win
/// over hook-supplied ones.
pub trait TranslationHook {
    /// Extra locale → value translations for one key of one file.
    fn translations(&self, file_basename: &str, key: &str) -> HashMap<String, String>;
}

pub struct DesktopParser<'a> {
    format_version: FormatVersion,
    hook: Option<&'a dyn TranslationHook>,
}

impl<'a> DesktopParser<'a> {
    pub fn new(format_version: FormatVersion) -> Self {
        DesktopParser {
            format_version,
            hook: None,
        }
    }

    pub fn with_hook(format_version: FormatVersion, hook: &'a dyn TranslationHook) -> Self {
        DesktopParser {
            format_version,
            hook: Some(hook),
        }
    }

    /// Parse one desktop-entry file into a component attached to `result`.
    /// Returns the component id, or None when the file is skipped. Problems
    /// become hints; the parse itself never fails the pipeline.
    pub fn parse(
        &self,
        result: &mut GeneratorResult,
        filename: &str,
        contents: &str,
        ignore_nodisplay: bool,
    ) -> Option<String> {
        let pairs = match parse_desktop_group(contents) {
            Ok(pairs) => pairs,
            Err(msg) => {
                let mut vars = HashMap::new();
                vars.insert("msg".to_string(), msg);
                result.add_hint(
                    HintSubject::File(filename.to_string()),
                    "desktop-file-error",
                    vars,
                );
                return None;
            }
        };

        let lookup = |key: &str| -> Option<&str> {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        if let Some(kind) = lookup("Type") {
            if !kind.eq_ignore_ascii_case("application") {
                return None;
            }
        }
        if let Some(nodisplay) = lookup("NoDisplay") {
            if nodisplay.eq_ignore_ascii_case("true") && !ignore_nodisplay {
                return None;
            }
        }
        if let Some(ignore) = lookup("X-AppStream-Ignore") {
            if ignore.eq_ignore_ascii_case("true") {
                return None;
            }
        }

        let cid = derive_component_id(filename, self.format_version);
        let mut cpt = Component::new(&cid);

        for (key, raw_value) in &pairs {
            let lc = match locale::decode(key) {
                Some(lc) => lc,
                None => continue,
            };
            let value = sanitize_value(raw_value);

            if is_quoted(&value) {
                let mut vars = HashMap::new();
                vars.insert("key".to_string(), key.clone());
                vars.insert("value".to_string(), value.clone());
                result.add_hint(
                    HintSubject::Component(cid.clone()),
                    "metainfo-quoted-value",
                    vars,
                );
            }

            match locale::key_base(key) {
                "Name" => cpt.set_name(&lc, &value),
                "Comment" => cpt.set_summary(&lc, &value),
                "Categories" => {
                    filter_categories(&mut cpt, &value, result, &cid);
                }
                "Keywords" => {
                    let mut words: Vec<String> =
                        value.split(';').map(|s| s.to_string()).collect();
                    if words.last().map(|w| w.is_empty()).unwrap_or(false) {
                        words.pop();
                    }
                    cpt.set_keywords(&lc, words);
                }
                "MimeType" => {
                    for mime in value.split(';') {
                        if !mime.is_empty() {
                            cpt.add_provided("mimetype", mime);
                        }
                    }
                }
                "Icon" => {
                    // Placeholder size; the real size is resolved by the
                    // icon pipeline later.
                    cpt.add_icon(Icon {
                        kind: "cached".to_string(),
                        name: value.clone(),
                        width: 1,
                        height: 1,
                    });
                }
                _ => {}
            }
        }

        if let Some(hook) = self.hook {
            for (locale, value) in hook.translations(filename, "Name") {
                if !cpt.has_name(&locale) {
                    cpt.set_name(&locale, &value);
                }
            }
            for (locale, value) in hook.translations(filename, "Comment") {
                if !cpt.has_summary(&locale) {
                    cpt.set_summary(&locale, &value);
                }
            }
        }

        result.add_component(filename, cpt);
        Some(cid)
    }
}

/// Parse the `[Desktop Entry]` group into key/value pairs in file order.
fn parse_desktop_group(contents: &str) -> Result<Vec<(String, String)>, String> {
    let mut pairs = Vec::new();
    let mut in_entry_group = false;
    let mut seen_entry_group = false;

    for line in contents.lines() {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_entry_group = trimmed == "[Desktop Entry]";
            seen_entry_group = seen_entry_group || in_entry_group;
            continue;
        }

        match line.find('=') {
            Some(eq) => {
                if in_entry_group {
                    let key = line[..eq].trim().to_string();
                    let value = line[eq + 1..].trim().to_string();
                    pairs.push((key, value));
                }
            }
            None => return Err(format!("Invalid line in key file: {}", trimmed)),
        }
    }

    if !seen_entry_group {
        return Err("No [Desktop Entry] group found".to_string());
    }

    Ok(pairs)
}

/// Component id for a desktop-file basename. Reverse-DNS basenames lose
/// their `.desktop` suffix from format version 0.8 on.
fn derive_component_id(filename: &str, format_version: FormatVersion) -> String {
    if format_version >= FormatVersion::V0_8 {
        if let Some(stem) = filename.strip_suffix(".desktop") {
            if let Some(first) = stem.split('.').next() {
                if stem.contains('.') && KNOWN_TLDS.contains(&first.to_lowercase().as_str()) {
                    return stem.to_string();
                }
            }
        }
    }

    filename.to_string()
}

/// Replace blacklisted control characters with a visible marker. Tab,
/// newline and carriage return are kept.
fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\u{00}' | '\u{08}' | '\u{0B}' | '\u{0C}' => out.push_str("#?#"),
            c if ('\u{0E}'..='\u{1F}').contains(&c) => out.push_str("#?#"),
            c => out.push(c),
        }
    }
    out
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
}

fn filter_categories(
    cpt: &mut Component,
    value: &str,
    result: &mut GeneratorResult,
    cid: &str,
) {
    for entry in value.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if CATEGORY_BLACKLIST.contains(&entry) {
            continue;
        }
        if entry.to_lowercase().starts_with("x-") {
            continue;
        }
        if !CANONICAL_CATEGORIES.contains(&entry) {
            let mut vars = HashMap::new();
            vars.insert("category".to_string(), entry.to_string());
            result.add_hint(
                HintSubject::Component(cid.to_string()),
                "category-name-invalid",
                vars,
            );
            continue;
        }
        cpt.add_category(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_ENTRY: &str = "[Desktop Entry]\n\
Type=Application\n\
Name=FooBar\n\
Name[de_DE]=FööBär\n\
Comment=A foo-ish bar.\n\
Keywords=Flubber;Test;Meh;\n\
Keywords[de_DE]=Goethe;Schiller;Kant;\n";

    fn parse_one(
        filename: &str,
        contents: &str,
        format_version: FormatVersion,
        ignore_nodisplay: bool,
    ) -> (GeneratorResult, Option<String>) {
        let mut result = GeneratorResult::new("test/1.0/amd64");
        let parser = DesktopParser::new(format_version);
        let cid = parser.parse(&mut result, filename, contents, ignore_nodisplay);
        (result, cid)
    }

    #[test]
    fn test_basic_desktop_file() {
        let (result, cid) = parse_one("foobar.desktop", BASIC_ENTRY, FormatVersion::V1_0, false);
        assert_eq!(cid, Some("foobar.desktop".to_string()));

        let cpt = result.get_component("foobar.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("FooBar"));
        assert_eq!(cpt.name("de_DE"), Some("FööBär"));
        assert_eq!(cpt.summary("C"), Some("A foo-ish bar."));
        assert_eq!(
            cpt.keywords("C"),
            Some(
                &[
                    "Flubber".to_string(),
                    "Test".to_string(),
                    "Meh".to_string()
                ][..]
            )
        );
        assert_eq!(
            cpt.keywords("de_DE"),
            Some(
                &[
                    "Goethe".to_string(),
                    "Schiller".to_string(),
                    "Kant".to_string()
                ][..]
            )
        );
    }

    #[test]
    fn test_reverse_dns_id_stripping() {
        let (result, cid) = parse_one(
            "org.example.foobar.desktop",
            BASIC_ENTRY,
            FormatVersion::V1_0,
            false,
        );
        assert_eq!(cid, Some("org.example.foobar".to_string()));
        assert!(result.get_component("org.example.foobar.desktop").is_some());
    }

    #[test]
    fn test_legacy_format_keeps_full_basename() {
        let (_, cid) = parse_one(
            "org.example.foobar.desktop",
            BASIC_ENTRY,
            FormatVersion::V0_6,
            false,
        );
        assert_eq!(cid, Some("org.example.foobar.desktop".to_string()));
    }

    #[test]
    fn test_unknown_prefix_keeps_full_basename() {
        let (_, cid) = parse_one(
            "example.foobar.desktop",
            BASIC_ENTRY,
            FormatVersion::V1_0,
            false,
        );
        assert_eq!(cid, Some("example.foobar.desktop".to_string()));
    }

    #[test]
    fn test_nodisplay_skip_and_override() {
        let contents = "[Desktop Entry]\nType=Application\nName=Hidden\nNoDisplay=true\n";

        let (result, cid) = parse_one("hidden.desktop", contents, FormatVersion::V1_0, false);
        assert_eq!(cid, None);
        assert_eq!(result.component_count(), 0);

        let (result, cid) = parse_one("hidden.desktop", contents, FormatVersion::V1_0, true);
        assert_eq!(cid, Some("hidden.desktop".to_string()));
        assert_eq!(result.component_count(), 1);
    }

    #[test]
    fn test_non_application_type_skipped() {
        let contents = "[Desktop Entry]\nType=Service\nName=Daemon\n";
        let (result, cid) = parse_one("daemon.desktop", contents, FormatVersion::V1_0, false);
        assert_eq!(cid, None);
        assert!(result.hints().is_empty());
    }

    #[test]
    fn test_appstream_ignore_skipped() {
        let contents =
            "[Desktop Entry]\nType=Application\nName=Tool\nX-AppStream-Ignore=true\n";
        let (_, cid) = parse_one("tool.desktop", contents, FormatVersion::V1_0, false);
        assert_eq!(cid, None);
    }

    #[test]
    fn test_category_filter() {
        let contents =
            "[Desktop Entry]\nType=Application\nName=Web\nCategories=Network;X-Foo;GUI;NotARealCategory;\n";
        let (result, _) = parse_one("web.desktop", contents, FormatVersion::V1_0, false);

        let cpt = result.get_component("web.desktop").unwrap();
        assert_eq!(cpt.categories().len(), 1);
        assert!(cpt.categories().contains("Network"));

        let invalid: Vec<_> = result
            .hints()
            .iter()
            .filter(|h| h.tag == "category-name-invalid")
            .collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].vars["category"], "NotARealCategory");
    }

    #[test]
    fn test_invalid_key_file_emits_hint() {
        let contents = "Name=Orphaned outside any group\n";
        let (result, cid) = parse_one("broken.desktop", contents, FormatVersion::V1_0, false);
        assert_eq!(cid, None);
        assert_eq!(result.hints().len(), 1);
        assert_eq!(result.hints()[0].tag, "desktop-file-error");
        assert_eq!(
            result.hints()[0].subject,
            HintSubject::File("broken.desktop".to_string())
        );
    }

    #[test]
    fn test_mimetype_and_icon() {
        let contents = "[Desktop Entry]\nType=Application\nName=Viewer\n\
MimeType=image/png;image/jpeg;;\nIcon=viewer-icon\n";
        let (result, _) = parse_one("viewer.desktop", contents, FormatVersion::V1_0, false);

        let cpt = result.get_component("viewer.desktop").unwrap();
        assert_eq!(
            cpt.provided("mimetype"),
            Some(&["image/png".to_string(), "image/jpeg".to_string()][..])
        );

        assert_eq!(cpt.icons().len(), 1);
        let icon = &cpt.icons()[0];
        assert_eq!(icon.kind, "cached");
        assert_eq!(icon.name, "viewer-icon");
        assert_eq!((icon.width, icon.height), (1, 1));
    }

    #[test]
    fn test_control_characters_replaced() {
        let contents = "[Desktop Entry]\nType=Application\nName=Bad\u{0008}Name\n";
        let (result, _) = parse_one("bad.desktop", contents, FormatVersion::V1_0, false);

        let cpt = result.get_component("bad.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("Bad#?#Name"));
    }

    #[test]
    fn test_quoted_value_kept_with_hint() {
        let contents = "[Desktop Entry]\nType=Application\nName=\"Quoted\"\n";
        let (result, _) = parse_one("quoted.desktop", contents, FormatVersion::V1_0, false);

        let cpt = result.get_component("quoted.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("\"Quoted\""));

        let hints: Vec<_> = result
            .hints()
            .iter()
            .filter(|h| h.tag == "metainfo-quoted-value")
            .collect();
        assert_eq!(hints.len(), 1);
    }

    #[test]
    fn test_bad_locale_key_ignored() {
        let contents = "[Desktop Entry]\nType=Application\nName=App\nName[123]=Nope\n";
        let (result, _) = parse_one("app.desktop", contents, FormatVersion::V1_0, false);

        let cpt = result.get_component("app.desktop").unwrap();
        assert_eq!(cpt.name("C"), Some("App"));
        assert_eq!(cpt.names().len(), 1);
    }

    struct FixedHook;

    impl TranslationHook for FixedHook {
        fn translations(&self, _file: &str, key: &str) -> HashMap<String, String> {
            let mut map = HashMap::new();
            if key == "Name" {
                map.insert("de_DE".to_string(), "Langpack".to_string());
                map.insert("fr".to_string(), "Paquet".to_string());
            }
            map
        }
    }

    #[test]
    fn test_hook_translations_merged_explicit_wins() {
        let mut result = GeneratorResult::new("test/1.0/amd64");
        let hook = FixedHook;
        let parser = DesktopParser::with_hook(FormatVersion::V1_0, &hook);
        parser.parse(&mut result, "foobar.desktop", BASIC_ENTRY, false);

        let cpt = result.get_component("foobar.desktop").unwrap();
        // The explicitly decoded locale wins over the hook
        assert_eq!(cpt.name("de_DE"), Some("FööBär"));
        // Locales only the hook knows about are merged in
        assert_eq!(cpt.name("fr"), Some("Paquet"));
    }
}
