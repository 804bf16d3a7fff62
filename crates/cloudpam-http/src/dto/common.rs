use cloudpam_store::PageRequest;
use serde::Deserialize;

/// Shared `page`/`page_size` query parameters, 1-indexed like
/// [`cloudpam_cidr::enumerate`].
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        let default = PageRequest::default();
        PageRequest {
            page: q.page.unwrap_or(default.page).max(1),
            page_size: q.page_size.unwrap_or(default.page_size).clamp(1, 500),
        }
    }
}
