//! Routing map files assembled from inline mappings and declared entries.

use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::fragment::ConfigFragment;
use crate::normalize::{normalize_mappings, split_mapping_line, MappingItem};
use crate::settings::RenderSettings;
use crate::validate::require_value;

/// Order key of the inline block; declared entries always follow it.
pub const INLINE_ORDER: &str = "00";

const AUTO_ORDER_STEP: usize = 10;
const AUTO_ORDER_MAX: usize = 90;

#[derive(Debug, Clone, Default)]
pub struct MapFile {
    pub name: String,
    /// Full path of the map file; defaults to `<map_dir>/<name>.map`.
    pub path: Option<String>,
    pub mappings: Vec<MappingItem>,
}

/// Mappings declared on their own and attached to a map file by name.
#[derive(Debug, Clone, Default)]
pub struct MapFileEntry {
    pub name: String,
    pub mapfile: String,
    /// `None` uses `name` itself as the single mapping line.
    pub mappings: Option<Vec<MappingItem>>,
    pub order: Option<String>,
}

/// Normalized mappings of one declared entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEntry {
    pub mappings: Vec<(String, String)>,
    pub order: Option<String>,
}

impl DeclaredEntry {
    pub fn from_entry(entry: &MapFileEntry) -> RenderResult<Self> {
        require_value("mapfile entry name", &entry.name)?;
        let mappings = match &entry.mappings {
            Some(items) => normalize_mappings(items)?,
            None => vec![split_mapping_line(&entry.name)?],
        };
        Ok(Self {
            mappings,
            order: entry.order.clone(),
        })
    }
}

fn mapping_lines(mappings: &[(String, String)]) -> String {
    mappings
        .iter()
        .map(|(key, value)| format!("{key} {value}\n"))
        .collect()
}

/// `"10"`, `"20"`, ... for the n-th (1-based) entry without an explicit order.
fn auto_order(position: usize) -> String {
    format!("{:02}", (position * AUTO_ORDER_STEP).min(AUTO_ORDER_MAX))
}

/// Builds the fragments of one map file: the inline block first, then every
/// declared entry in declaration order unless it carries its own order key.
pub fn assemble_map_file(
    name: &str,
    target: &str,
    inline: &[(String, String)],
    entries: &[DeclaredEntry],
) -> RenderResult<Vec<ConfigFragment>> {
    require_value("mapfile name", name)?;

    let mut fragments = Vec::with_capacity(entries.len() + 1);
    fragments.push(ConfigFragment::new(target, INLINE_ORDER, mapping_lines(inline)));

    let mut auto_position = 0;
    for entry in entries {
        let order = match &entry.order {
            Some(order) if order.trim().is_empty() => {
                return Err(RenderError::invalid_argument(format!(
                    "mapfile {name}: entry order must not be empty"
                )));
            }
            Some(order) if order.as_str() < INLINE_ORDER => {
                return Err(RenderError::invalid_argument(format!(
                    "mapfile {name}: entry order '{order}' sorts before the inline block '{INLINE_ORDER}'"
                )));
            }
            Some(order) => order.clone(),
            None => {
                auto_position += 1;
                auto_order(auto_position)
            }
        };
        fragments.push(ConfigFragment::new(target, order, mapping_lines(&entry.mappings)));
    }

    debug!(mapfile = name, path = %target, entries = entries.len(), "assembled map file");
    Ok(fragments)
}

/// Renders a declared map file together with the entries that name it.
pub fn render_map_file(
    mapfile: &MapFile,
    entries: &[&MapFileEntry],
    settings: &RenderSettings,
) -> RenderResult<Vec<ConfigFragment>> {
    let target = match &mapfile.path {
        Some(path) => path.clone(),
        None => settings.map_path(&mapfile.name),
    };
    let inline = normalize_mappings(&mapfile.mappings)?;
    let declared = entries
        .iter()
        .map(|entry| DeclaredEntry::from_entry(entry))
        .collect::<RenderResult<Vec<_>>>()?;
    assemble_map_file(&mapfile.name, &target, &inline, &declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::assemble_target;

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn inline_block_is_order_zero() {
        let fragments = assemble_map_file(
            "domains-to-backends",
            "/etc/haproxy/domains-to-backends.map",
            &[pair("app01.example.com", "bk_app01"), pair("app02.example.com", "bk_app02")],
            &[],
        )
        .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].order, "00");
        assert_eq!(
            fragments[0].content,
            "app01.example.com bk_app01\napp02.example.com bk_app02\n"
        );
    }

    #[test]
    fn empty_inline_block_still_renders() {
        let fragments = assemble_map_file("m", "/m.map", &[], &[]).unwrap();
        assert_eq!(fragments[0].content, "");
    }

    #[test]
    fn entry_without_mappings_uses_its_name() {
        let entry = MapFileEntry {
            name: "example.com example-backend".into(),
            mapfile: "domains-to-backends".into(),
            ..MapFileEntry::default()
        };
        let declared = DeclaredEntry::from_entry(&entry).unwrap();
        let fragments = assemble_map_file("domains-to-backends", "/m.map", &[], &[declared]).unwrap();
        assert_eq!(fragments[1].order, "10");
        assert_eq!(fragments[1].content, "example.com example-backend\n");
    }

    #[test]
    fn explicit_orders_interleave_with_auto_orders() {
        let entries = vec![
            DeclaredEntry {
                mappings: vec![pair("b", "2")],
                order: None,
            },
            DeclaredEntry {
                mappings: vec![pair("a", "1")],
                order: Some("05".into()),
            },
            DeclaredEntry {
                mappings: vec![pair("c", "3")],
                order: None,
            },
        ];
        let fragments = assemble_map_file("m", "/m.map", &[pair("top", "0")], &entries).unwrap();
        let orders: Vec<&str> = fragments.iter().map(|f| f.order.as_str()).collect();
        assert_eq!(orders, vec!["00", "10", "05", "20"]);
        assert_eq!(
            assemble_target(&fragments, "/m.map").unwrap(),
            "top 0\na 1\nb 2\nc 3\n"
        );
    }

    #[test]
    fn auto_order_saturates_without_reordering() {
        let entries: Vec<DeclaredEntry> = (0..12)
            .map(|i| DeclaredEntry {
                mappings: vec![pair(&format!("k{i}"), "v")],
                order: None,
            })
            .collect();
        let fragments = assemble_map_file("m", "/m.map", &[], &entries).unwrap();
        assert_eq!(fragments[12].order, "90");
        let content = assemble_target(&fragments, "/m.map").unwrap();
        let keys: Vec<&str> = content.lines().map(|l| l.split(' ').next().unwrap()).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("k{i}")).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn explicit_order_cannot_precede_the_inline_block() {
        for order in ["0", "!", "-1", "0 "] {
            let entries = vec![DeclaredEntry {
                mappings: vec![pair("late.example", "bk")],
                order: Some(order.into()),
            }];
            let err = assemble_map_file("m", "/m.map", &[pair("inline.example", "bk0")], &entries)
                .unwrap_err();
            assert!(matches!(err, RenderError::InvalidArgument(_)), "{order}");
        }

        let entries = vec![DeclaredEntry {
            mappings: vec![pair("late.example", "bk")],
            order: Some("00".into()),
        }];
        let fragments =
            assemble_map_file("m", "/m.map", &[pair("inline.example", "bk0")], &entries).unwrap();
        assert_eq!(
            assemble_target(&fragments, "/m.map").unwrap(),
            "inline.example bk0\nlate.example bk\n"
        );
    }

    #[test]
    fn blank_explicit_order_is_rejected() {
        let entries = vec![DeclaredEntry {
            mappings: vec![pair("a", "1")],
            order: Some(" ".into()),
        }];
        let err = assemble_map_file("m", "/m.map", &[], &entries).unwrap_err();
        assert!(matches!(err, RenderError::InvalidArgument(_)));
    }
}
