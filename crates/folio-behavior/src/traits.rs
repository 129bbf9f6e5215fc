//! Component trait.

use crate::runtime::Page;

/// A behaviour mounted onto a page.
///
/// Components register their listeners and observers when mounted and
/// remove every one of them on [`Component::unmount`]. Unmounting twice is
/// harmless.
pub trait Component {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Remove everything the component registered with the page.
    fn unmount(&self, page: &mut Page);
}
