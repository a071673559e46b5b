use serde::Serialize;

/// Default page size for entry listings
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Paging and filtering for an entry listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub path: String,
    pub page_index: u32,
    pub page_size: u32,
    pub sharable: bool,
    pub search_key: String,
}

impl Default for EntryQuery {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sharable: true,
            search_key: String::new(),
        }
    }
}

impl EntryQuery {
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn page(mut self, index: u32, size: u32) -> Self {
        self.page_index = index;
        self.page_size = size;
        self
    }

    pub fn search(mut self, key: impl Into<String>) -> Self {
        self.search_key = key.into();
        self
    }

    pub fn sharable(mut self, sharable: bool) -> Self {
        self.sharable = sharable;
        self
    }

    /// Query pairs in the order the API expects them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("path", self.path.clone()),
            ("pageIndex", self.page_index.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("searchKey", self.search_key.clone()),
            ("sharable", self.sharable.to_string()),
        ]
    }
}

/// Body of an access-token request for a set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRequest {
    pub claim_types: Vec<String>,
    pub document_ids: Vec<String>,
    pub email: Option<String>,
    pub signature: bool,
    pub organization_id: Option<String>,
}

impl AccessTokenRequest {
    pub fn new(claim_types: Vec<String>, document_ids: Vec<String>) -> Self {
        Self {
            claim_types,
            document_ids,
            email: None,
            signature: true,
            organization_id: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn signature(mut self, signature: bool) -> Self {
        self.signature = signature;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PermissionType {
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    #[serde(rename = "type")]
    pub kind: PermissionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub share_to: String,
    pub id: String,
    pub permissions: Vec<Permission>,
}

impl ShareRequest {
    pub fn new(id: impl Into<String>, share_to: impl Into<String>, allow_download: bool) -> Self {
        let permissions = if allow_download {
            vec![Permission {
                kind: PermissionType::Download,
            }]
        } else {
            Vec::new()
        };
        Self {
            share_to: share_to.into(),
            id: id.into(),
            permissions,
        }
    }
}
