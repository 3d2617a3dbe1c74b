//! Contrats de configuration du deck
//!
//! - Pages (identifiant + nom affiché)
//! - Table statique des boutons indexée par (page?, ligne, colonne)
//! - Layouts de grille comme `4x4`
//! - Identifiants de boutons préfixés par la page

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ContractError;
use crate::events::TelemetrySample;

/// Collection nommée de boutons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
}

impl Page {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Vérifie l'unicité des identifiants de page du jeu actif
pub fn validate_pages(pages: &[Page]) -> Result<(), ContractError> {
    if pages.is_empty() {
        return Err(ContractError::NoPages);
    }
    let mut seen = HashSet::new();
    for page in pages {
        if !seen.insert(page.id.as_str()) {
            return Err(ContractError::DuplicatePage(page.id.clone()));
        }
    }
    Ok(())
}

/// Ce que fait un bouton quand on l'appuie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    #[serde(alias = "keyboard")]
    Keystroke,
    #[serde(alias = "application")]
    ApplicationLaunch,
    #[serde(alias = "widget")]
    TelemetryWidget,
}

impl ActionKind {
    /// Les widgets affichent la télémétrie et ne produisent jamais d'intent
    pub fn is_pressable(self) -> bool {
        !matches!(self, ActionKind::TelemetryWidget)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Keystroke => "keystroke",
            ActionKind::ApplicationLaunch => "application-launch",
            ActionKind::TelemetryWidget => "telemetry-widget",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Métrique affichée par un widget de télémétrie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKey {
    Cpu,
    Memory,
    Gpu,
    Network,
}

impl MetricKey {
    pub fn read(self, sample: &TelemetrySample) -> Option<f32> {
        match self {
            MetricKey::Cpu => sample.cpu_usage,
            MetricKey::Memory => sample.memory_usage,
            MetricKey::Gpu => sample.gpu_usage,
            MetricKey::Network => sample.network_usage,
        }
    }
}

/// Identifiant de bouton préfixé par la page : `<pageId>/btn-<row>-<col>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonId(String);

impl ButtonId {
    pub fn for_cell(page_id: &str, row: u16, col: u16) -> Self {
        Self(format!("{page_id}/btn-{row}-{col}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ButtonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ButtonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Une entrée de la table statique des boutons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    pub row: u16,
    pub col: u16,
    /// `None` = entrée partagée par toutes les pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub label: String,
    pub action_kind: ActionKind,
    #[serde(default)]
    pub action_payload: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricKey>,
}

impl ButtonConfig {
    fn action(row: u16, col: u16, label: &str, kind: ActionKind, payload: &str, color: &str) -> Self {
        Self {
            row,
            col,
            page: None,
            label: label.to_string(),
            action_kind: kind,
            action_payload: payload.to_string(),
            color: color.to_string(),
            metric: None,
        }
    }

    fn widget(row: u16, col: u16, label: &str, metric: MetricKey, color: &str) -> Self {
        Self {
            row,
            col,
            page: None,
            label: label.to_string(),
            action_kind: ActionKind::TelemetryWidget,
            action_payload: String::new(),
            color: color.to_string(),
            metric: Some(metric),
        }
    }

    fn validate(&self) -> Result<(), ContractError> {
        match self.action_kind {
            ActionKind::TelemetryWidget if self.metric.is_none() => {
                Err(ContractError::WidgetWithoutMetric(self.label.clone()))
            }
            ActionKind::Keystroke | ActionKind::ApplicationLaunch
                if self.action_payload.trim().is_empty() =>
            {
                Err(ContractError::MissingPayload(self.label.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Table statique (page?, ligne, colonne) → bouton, immuable une fois chargée.
///
/// Une entrée propre à la page l'emporte sur une entrée partagée aux mêmes coordonnées.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ButtonConfig>", into = "Vec<ButtonConfig>")]
pub struct ButtonTable {
    entries: Vec<ButtonConfig>,
}

impl ButtonTable {
    pub fn new(entries: Vec<ButtonConfig>) -> Result<Self, ContractError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            entry.validate()?;
            if !seen.insert((entry.page.clone(), entry.row, entry.col)) {
                return Err(ContractError::DuplicateButton {
                    page: entry.page.clone().unwrap_or_else(|| "*".to_string()),
                    row: entry.row,
                    col: entry.col,
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn lookup(&self, page_id: &str, row: u16, col: u16) -> Option<&ButtonConfig> {
        let at = |b: &&ButtonConfig| b.row == row && b.col == col;
        self.entries
            .iter()
            .filter(at)
            .find(|b| b.page.as_deref() == Some(page_id))
            .or_else(|| self.entries.iter().filter(at).find(|b| b.page.is_none()))
    }

    pub fn entries(&self) -> &[ButtonConfig] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<ButtonConfig>> for ButtonTable {
    type Error = ContractError;

    fn try_from(entries: Vec<ButtonConfig>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ButtonTable> for Vec<ButtonConfig> {
    fn from(table: ButtonTable) -> Self {
        table.entries
    }
}

impl Default for ButtonTable {
    /// Deck d'origine : raccourcis en ligne 0, lancements en ligne 1, widgets en ligne 2
    fn default() -> Self {
        use ActionKind::{ApplicationLaunch, Keystroke};
        Self {
            entries: vec![
                ButtonConfig::action(0, 0, "START", Keystroke, "CTRL+SHIFT+S", "#00ff00"),
                ButtonConfig::action(0, 1, "STOP", Keystroke, "CTRL+SHIFT+Q", "#ff0000"),
                ButtonConfig::action(0, 2, "MUTE", Keystroke, "CTRL+M", "#ffff00"),
                ButtonConfig::action(0, 3, "SCREENSHOT", Keystroke, "PRTSC", "#00ffff"),
                ButtonConfig::action(1, 0, "CHROME", ApplicationLaunch, "chrome.exe", "#4285f4"),
                ButtonConfig::action(1, 1, "DISCORD", ApplicationLaunch, "discord.exe", "#7289da"),
                ButtonConfig::action(1, 2, "SPOTIFY", ApplicationLaunch, "spotify.exe", "#1db954"),
                ButtonConfig::action(1, 3, "NOTEPAD", ApplicationLaunch, "notepad.exe", "#ffffff"),
                ButtonConfig::widget(2, 0, "CPU", MetricKey::Cpu, "#00ff00"),
                ButtonConfig::widget(2, 1, "RAM", MetricKey::Memory, "#ff00ff"),
                ButtonConfig::widget(2, 2, "GPU", MetricKey::Gpu, "#00ffff"),
                ButtonConfig::widget(2, 3, "NET", MetricKey::Network, "#ffff00"),
            ],
        }
    }
}

/// Jeu de pages d'origine
pub fn default_pages() -> Vec<Page> {
    vec![Page::new("page1", "Main"), Page::new("page2", "Streaming")]
}

/// Grid shape (rows × columns), client-local
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Layout {
    rows: u16,
    cols: u16,
}

impl Layout {
    pub const MAX_DIMENSION: u16 = 16;

    pub fn new(rows: u16, cols: u16) -> Result<Self, ContractError> {
        let range = 1..=Self::MAX_DIMENSION;
        if !range.contains(&rows) || !range.contains(&cols) {
            return Err(ContractError::LayoutOutOfRange {
                rows,
                cols,
                max: Self::MAX_DIMENSION,
            });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Cellules ligne par ligne
    pub fn cells(&self) -> impl Iterator<Item = (u16, u16)> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self { rows: 4, cols: 4 }
    }
}

impl FromStr for Layout {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ContractError::InvalidLayout(s.to_string());
        let (rows, cols) = s
            .trim()
            .split_once(|c| c == 'x' || c == 'X')
            .ok_or_else(invalid)?;
        let rows = rows.trim().parse::<u16>().map_err(|_| invalid())?;
        let cols = cols.trim().parse::<u16>().map_err(|_| invalid())?;
        Self::new(rows, cols)
    }
}

impl TryFrom<String> for Layout {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Layout> for String {
    fn from(layout: Layout) -> Self {
        layout.to_string()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parsing() {
        let layout: Layout = "4x4".parse().unwrap();
        assert_eq!(layout.cell_count(), 16);
        assert_eq!("3X5".parse::<Layout>().unwrap().to_string(), "3x5");
        assert!(matches!("4by4".parse::<Layout>(), Err(ContractError::InvalidLayout(_))));
        assert!(matches!("0x4".parse::<Layout>(), Err(ContractError::LayoutOutOfRange { .. })));
        assert!(matches!("17x1".parse::<Layout>(), Err(ContractError::LayoutOutOfRange { .. })));
    }

    #[test]
    fn test_layout_cells_row_major() {
        let layout = Layout::new(2, 3).unwrap();
        let cells: Vec<_> = layout.cells().collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_button_id_is_page_scoped() {
        assert_eq!(ButtonId::for_cell("page1", 2, 3).as_str(), "page1/btn-2-3");
        assert_ne!(ButtonId::for_cell("page1", 0, 0), ButtonId::for_cell("page2", 0, 0));
    }

    #[test]
    fn test_page_specific_entry_wins() {
        let mut entries = ButtonTable::default().entries().to_vec();
        entries.push(ButtonConfig {
            page: Some("page2".into()),
            ..ButtonConfig::action(0, 0, "LIVE", ActionKind::Keystroke, "F9", "#ff0000")
        });
        let table = ButtonTable::new(entries).unwrap();

        assert_eq!(table.lookup("page1", 0, 0).unwrap().label, "START");
        assert_eq!(table.lookup("page2", 0, 0).unwrap().label, "LIVE");
        assert_eq!(table.lookup("page2", 1, 0).unwrap().label, "CHROME");
        assert!(table.lookup("page1", 3, 3).is_none());
    }

    #[test]
    fn test_table_validation() {
        let dup = vec![
            ButtonConfig::action(0, 0, "A", ActionKind::Keystroke, "A", "#fff"),
            ButtonConfig::action(0, 0, "B", ActionKind::Keystroke, "B", "#fff"),
        ];
        assert!(matches!(ButtonTable::new(dup), Err(ContractError::DuplicateButton { .. })));

        let mut widget = ButtonConfig::widget(2, 0, "CPU", MetricKey::Cpu, "#0f0");
        widget.metric = None;
        assert_eq!(
            ButtonTable::new(vec![widget]).unwrap_err(),
            ContractError::WidgetWithoutMetric("CPU".into())
        );

        let empty = ButtonConfig::action(0, 0, "NOP", ActionKind::ApplicationLaunch, " ", "#fff");
        assert_eq!(
            ButtonTable::new(vec![empty]).unwrap_err(),
            ContractError::MissingPayload("NOP".into())
        );
    }

    #[test]
    fn test_table_accepts_legacy_kind_names() {
        let json = r##"[
            {"row": 0, "col": 0, "label": "START", "actionKind": "keyboard", "actionPayload": "CTRL+S", "color": "#0f0"},
            {"row": 2, "col": 0, "label": "CPU", "actionKind": "widget", "color": "#0f0", "metric": "cpu"}
        ]"##;
        let table: ButtonTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.lookup("any", 0, 0).unwrap().action_kind, ActionKind::Keystroke);
        assert_eq!(table.lookup("any", 2, 0).unwrap().metric, Some(MetricKey::Cpu));
    }

    #[test]
    fn test_validate_pages() {
        assert!(validate_pages(&default_pages()).is_ok());
        assert_eq!(validate_pages(&[]), Err(ContractError::NoPages));
        let dup = vec![Page::new("p", "A"), Page::new("p", "B")];
        assert_eq!(validate_pages(&dup), Err(ContractError::DuplicatePage("p".into())));
    }
}
