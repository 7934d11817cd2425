//! Style fragment shown above the form confirmation
//!
//! The confirmation markup contains one section per serviceability status;
//! the fragment hides every section except the one matching the result.

use crate::types::SqStatus;

/// Build the `<style>` block that hides the two non-matching `.sq-*` sections
pub fn style_fragment(result: SqStatus) -> String {
    let mut style = String::from("<style>");
    for status in SqStatus::ALL {
        if status != result {
            style.push_str(&format!(".sq-{} {{display: none!important;}}", status));
        }
    }
    style.push_str("</style>");
    style
}
