use thiserror::Error;

/// Largest `page-size` the upstream catalogue accepts.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Most satellites a single fetch may ask for. The plan is laid out up front, so this
/// also bounds its memory.
pub const DEFAULT_MAX_FETCH_SIZE: u32 = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid size parameter: at least one satellite must be requested")]
    NothingRequested,
    #[error("invalid chunk-size parameter: {chunk_size} is not between 1 and {max_page_size}")]
    InvalidChunkSize { chunk_size: u32, max_page_size: u32 },
    #[error("invalid size parameter: {total} is more than the {max_total} satellites a fetch may request")]
    TooManyRequested { total: u32, max_total: u32 },
}

/// A single page request against the catalogue. Pages are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

/// The page requests needed to pull `total` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    page_size: u32,
    pages: Vec<PageRequest>,
}

impl FetchPlan {
    /// Split `total` into page requests of `chunk_size` (or as large as the catalogue allows).
    /// The final page only asks for what is left over, so we never request more than `total`.
    pub fn new(
        total: u32,
        chunk_size: Option<u32>,
        max_page_size: u32,
        max_total: u32,
    ) -> Result<Self, PlanError> {
        let max_page_size = max_page_size.max(1);

        let page_size = match chunk_size {
            Some(chunk_size) if chunk_size == 0 || chunk_size > max_page_size => {
                return Err(PlanError::InvalidChunkSize {
                    chunk_size,
                    max_page_size,
                })
            }
            Some(chunk_size) => chunk_size,
            None => std::cmp::min(total, max_page_size),
        };

        if total == 0 {
            return Err(PlanError::NothingRequested);
        }
        if total > max_total {
            return Err(PlanError::TooManyRequested { total, max_total });
        }

        let total_pages = total.div_ceil(page_size);
        let pages = (1..=total_pages)
            .map(|page| PageRequest {
                page,
                size: if page == total_pages {
                    total - page_size * (total_pages - 1)
                } else {
                    page_size
                },
            })
            .collect();

        Ok(Self { page_size, pages })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn pages(&self) -> &[PageRequest] {
        &self.pages
    }

    pub fn total(&self) -> u32 {
        self.pages.iter().map(|request| request.size).sum()
    }
}
