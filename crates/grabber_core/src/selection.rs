/// One scanned playlist entry as the selection stage sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    /// 1-based position in the scan result. Never renumbered.
    pub index: usize,
    pub title: String,
    pub source_url: String,
    pub id: String,
    pub included: bool,
    pub renamed: bool,
}

impl TrackRow {
    pub fn new(index: usize, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            source_url: source_url.into(),
            id: String::new(),
            included: true,
            renamed: false,
        }
    }
}

/// Include toggles and renames over the rows of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackSelection {
    rows: Vec<TrackRow>,
}

impl TrackSelection {
    /// Every row starts included.
    pub fn new(rows: Vec<TrackRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| TrackRow {
                included: true,
                ..row
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn included_count(&self) -> usize {
        self.rows.iter().filter(|row| row.included).count()
    }

    /// Flips the include toggle. Returns false for an unknown index.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.row_mut(index) {
            Some(row) => {
                row.included = !row.included;
                true
            }
            None => false,
        }
    }

    pub fn set_included(&mut self, index: usize, included: bool) -> bool {
        match self.row_mut(index) {
            Some(row) => {
                row.included = included;
                true
            }
            None => false,
        }
    }

    /// Replaces the row's title. A blank title keeps the previous one.
    pub fn rename(&mut self, index: usize, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        match self.row_mut(index) {
            Some(row) if row.title != title => {
                row.title = title.to_string();
                row.renamed = true;
                true
            }
            _ => false,
        }
    }

    pub fn select_all(&mut self) {
        self.rows.iter_mut().for_each(|row| row.included = true);
    }

    pub fn deselect_all(&mut self) {
        self.rows.iter_mut().for_each(|row| row.included = false);
    }

    /// Included rows in original index order.
    pub fn confirm(&self) -> Vec<TrackRow> {
        self.rows.iter().filter(|row| row.included).cloned().collect()
    }

    fn row_mut(&mut self, index: usize) -> Option<&mut TrackRow> {
        self.rows.iter_mut().find(|row| row.index == index)
    }
}
