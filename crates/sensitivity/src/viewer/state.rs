use sensitivity_core::{SensitivityAnalyzer, SensitivityError, StyledTable, StyledTables, TableKey};

/// Everything the viewer shows: the styled tables and which one is active
pub struct ViewerState {
    pub title: String,
    pub tables: Vec<(TableKey, StyledTable)>,
    pub active: usize,
    /// First visible body row of the active table
    pub scroll: usize,
    pub exit: bool,
}

impl ViewerState {
    pub fn new(title: impl Into<String>, tables: StyledTables) -> Self {
        Self {
            title: title.into(),
            tables: tables.into_iter().collect(),
            active: 0,
            scroll: 0,
            exit: false,
        }
    }

    pub fn from_analyzer(analyzer: &SensitivityAnalyzer) -> Result<Self, SensitivityError> {
        let title = analyzer.label(analyzer.result_name()).to_string();
        Ok(Self::new(title, analyzer.styled_tables()?))
    }

    pub fn active_table(&self) -> Option<&StyledTable> {
        self.tables.get(self.active).map(|(_, table)| table)
    }

    pub fn select(&mut self, index: usize) {
        if index < self.tables.len() && index != self.active {
            self.active = index;
            self.scroll = 0;
        }
    }

    pub fn next_tab(&mut self) {
        if !self.tables.is_empty() {
            self.select((self.active + 1) % self.tables.len());
        }
    }

    pub fn previous_tab(&mut self) {
        if !self.tables.is_empty() {
            let n = self.tables.len();
            self.select((self.active + n - 1) % n);
        }
    }

    pub fn scroll_down(&mut self) {
        let rows = self.active_table().map(StyledTable::n_rows).unwrap_or(0);
        if self.scroll + 1 < rows {
            self.scroll += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }
}
