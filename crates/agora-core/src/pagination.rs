use agora_types::api::PageQuery;

use crate::{Result, ServiceError};

pub const MAX_PAGE_SIZE: u32 = 100;

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(page_number: u32, page_size: u32) -> Result<Self> {
        if page_number == 0 || page_size == 0 {
            return Err(ServiceError::InvalidInput("invalid pagination parameters".into()));
        }
        let limit = page_size.min(MAX_PAGE_SIZE);
        Ok(Self {
            limit,
            offset: (page_number - 1).saturating_mul(limit),
        })
    }
}

impl TryFrom<PageQuery> for Page {
    type Error = ServiceError;

    fn try_from(query: PageQuery) -> Result<Self> {
        Self::new(query.page_number, query.page_size)
    }
}
