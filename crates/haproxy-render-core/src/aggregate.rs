use std::collections::BTreeMap;

use serde::Serialize;

use crate::fragment::ConfigFragment;

/// Final content of one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedFile {
    pub target: String,
    pub content: String,
}

/// Groups fragments by target and concatenates each group by order key,
/// ties broken by position in `fragments`. Files come back sorted by target.
pub fn assemble_files(fragments: &[ConfigFragment]) -> Vec<RenderedFile> {
    let mut grouped: BTreeMap<&str, Vec<(usize, &ConfigFragment)>> = BTreeMap::new();
    for (index, fragment) in fragments.iter().enumerate() {
        grouped
            .entry(fragment.target.as_str())
            .or_default()
            .push((index, fragment));
    }

    grouped
        .into_iter()
        .map(|(target, mut members)| {
            members.sort_by(|(a_index, a), (b_index, b)| {
                a.order.cmp(&b.order).then(a_index.cmp(b_index))
            });
            let content = members
                .iter()
                .map(|(_, fragment)| fragment.content.as_str())
                .collect();
            RenderedFile {
                target: target.to_string(),
                content,
            }
        })
        .collect()
}

/// Content of a single target, or `None` when nothing renders into it.
pub fn assemble_target(fragments: &[ConfigFragment], target: &str) -> Option<String> {
    assemble_files(fragments)
        .into_iter()
        .find(|file| file.target == target)
        .map(|file| file.content)
}
