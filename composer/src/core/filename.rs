//! Description-tag filename lineage.
//!
//! Output filenames carry a `_desc-…` fragment recording the processing
//! applied so far. Chained operations extend the fragment rather than
//! replacing it, so a filename like `sub01_desc-sm+PearsonCorr_connectome.npy`
//! reads as its own provenance trail.

use std::sync::OnceLock;

use regex::Regex;

/// Separator used when appending a new label to an existing tag.
pub const LABEL_SEPARATOR: &str = "+";

/// A description tag runs from `_desc` up to (not including) the next `_`.
fn desc_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_desc[^_]+").expect("valid desc tag regex"))
}

/// Find the existing description tag in a filename, if any.
pub fn find_desc_tag(filename: &str) -> Option<&str> {
    desc_tag_regex().find(filename).map(|found| found.as_str())
}

/// Derive an output filename from an input filename.
///
/// If the input carries a description tag, the new label is appended to it
/// with [`LABEL_SEPARATOR`] and the type suffix is rewritten. Otherwise a
/// fresh `_desc-<label>` tag is inserted in place of the old suffix:
///
/// - `sub01_desc-sm_timeseries.1D` + `PearsonCorr` →
///   `sub01_desc-sm+PearsonCorr_connectome.npy`
/// - `sub01_timeseries.1D` + `PearsonCorr` →
///   `sub01_desc-PearsonCorr_connectome.npy`
pub fn derive_output_name(
    input: &str,
    label: &str,
    old_suffix: &str,
    new_suffix: &str,
) -> String {
    match find_desc_tag(input) {
        Some(tag) => {
            let extended = format!("{tag}{LABEL_SEPARATOR}{label}");
            input.replace(tag, &extended).replace(old_suffix, new_suffix)
        }
        None => input.replace(old_suffix, &format!("_desc-{label}{new_suffix}")),
    }
}
