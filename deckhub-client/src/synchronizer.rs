//! État de la grille côté client.
//!
//! La grille affichée est une fonction pure de (page, layout, table des boutons) ;
//! les événements broadcast la décorent ensuite : statut de feedback, valeurs
//! des widgets, pulses d'appui. Aucune I/O ici : chaque transition se teste
//! avec un `now` explicite.

use deckhub_contracts::{
    ActionIntent, ActionKind, BroadcastEvent, ButtonConfig, ButtonId, ButtonTable, ClientMessage,
    ControlMessage, FeedbackStatus, Layout, MetricKey, PressRequest, ServerMessage,
    TelemetrySample,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Durée du pulse visuel après un appui
pub const PULSE_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    fn can_become(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting { .. })
                | (Connecting, Disconnected)
                | (Connected, Reconnecting { .. })
                | (Connected, Disconnected)
                | (Reconnecting { .. }, Connected)
                | (Reconnecting { .. }, Reconnecting { .. })
                | (Reconnecting { .. }, Disconnected)
        )
    }
}

/// Une cellule de la grille telle qu'affichée
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedButton {
    pub id: ButtonId,
    pub row: u16,
    pub col: u16,
    pub label: String,
    pub color: Option<String>,
    /// `None` = placeholder, aucun bouton configuré à ces coordonnées
    pub action_kind: Option<ActionKind>,
    pub action_payload: String,
    pub metric: Option<MetricKey>,
    /// Valeur affichée par un widget ("42%")
    pub widget_value: Option<String>,
    pub status: Option<FeedbackStatus>,
    pub status_message: Option<String>,
    pulse_until: Option<Instant>,
}

impl RenderedButton {
    fn configured(page_id: &str, cfg: &ButtonConfig) -> Self {
        let is_widget = cfg.action_kind == ActionKind::TelemetryWidget;
        Self {
            id: ButtonId::for_cell(page_id, cfg.row, cfg.col),
            row: cfg.row,
            col: cfg.col,
            label: cfg.label.clone(),
            color: Some(cfg.color.clone()),
            action_kind: Some(cfg.action_kind),
            action_payload: cfg.action_payload.clone(),
            metric: cfg.metric,
            widget_value: is_widget.then(|| "0%".to_string()),
            status: None,
            status_message: None,
            pulse_until: None,
        }
    }

    fn placeholder(page_id: &str, row: u16, col: u16) -> Self {
        Self {
            id: ButtonId::for_cell(page_id, row, col),
            row,
            col,
            label: format!("{row}-{col}"),
            color: None,
            action_kind: None,
            action_payload: String::new(),
            metric: None,
            widget_value: None,
            status: None,
            status_message: None,
            pulse_until: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.action_kind.is_none()
    }

    pub fn is_pressable(&self) -> bool {
        self.action_kind.is_some_and(ActionKind::is_pressable)
    }

    pub fn is_pulsing(&self, now: Instant) -> bool {
        self.pulse_until.is_some_and(|until| now < until)
    }

    fn pulse(&mut self, now: Instant) {
        self.pulse_until = Some(now + PULSE_DURATION);
    }
}

pub struct ClientSynchronizer {
    table: ButtonTable,
    page_id: String,
    layout: Layout,
    cells: Vec<RenderedButton>,
    state: ConnectionState,
    last_sample: Option<TelemetrySample>,
    last_error: Option<String>,
}

impl ClientSynchronizer {
    pub fn new(table: ButtonTable, page_id: impl Into<String>, layout: Layout) -> Self {
        let mut sync = Self {
            table,
            page_id: page_id.into(),
            layout,
            cells: Vec::new(),
            state: ConnectionState::Disconnected,
            last_sample: None,
            last_error: None,
        };
        sync.rebuild();
        sync
    }

    fn rebuild(&mut self) {
        let page_id = self.page_id.as_str();
        self.cells = self
            .layout
            .cells()
            .map(|(row, col)| match self.table.lookup(page_id, row, col) {
                Some(cfg) => RenderedButton::configured(page_id, cfg),
                None => RenderedButton::placeholder(page_id, row, col),
            })
            .collect();
        debug!(page = %self.page_id, layout = %self.layout, cells = self.cells.len(), "grid rebuilt");
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn set_state(&mut self, next: ConnectionState) -> Result<(), ClientError> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_become(next) {
            return Err(ClientError::InvalidTransition { from: self.state, to: next });
        }
        debug!("connection {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Cellules ligne par ligne
    pub fn cells(&self) -> &[RenderedButton] {
        &self.cells
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&RenderedButton> {
        if row >= self.layout.rows() || col >= self.layout.cols() {
            return None;
        }
        self.cells.get(usize::from(row) * usize::from(self.layout.cols()) + usize::from(col))
    }

    fn cell_mut(&mut self, id: &ButtonId) -> Option<&mut RenderedButton> {
        self.cells.iter_mut().find(|cell| &cell.id == id)
    }

    pub fn last_sample(&self) -> Option<&TelemetrySample> {
        self.last_sample.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Change la forme de la grille ; les décorations (statut, valeurs) repartent de zéro
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.rebuild();
    }

    /// Navigation : nouvelle grille, aucun historique rejoué
    pub fn switch_page(&mut self, page_id: impl Into<String>) {
        self.page_id = page_id.into();
        self.rebuild();
    }

    /// Appui local : pulse + frame à envoyer. Widgets et cases vides n'émettent rien.
    pub fn press(&mut self, row: u16, col: u16, now: Instant) -> Option<ClientMessage> {
        if row >= self.layout.rows() || col >= self.layout.cols() {
            return None;
        }
        let page_id = self.page_id.clone();
        let index = usize::from(row) * usize::from(self.layout.cols()) + usize::from(col);
        let cell = self.cells.get_mut(index)?;
        let kind = cell.action_kind.filter(|kind| kind.is_pressable())?;
        cell.pulse(now);

        Some(ClientMessage::ButtonPressed(PressRequest {
            page_id,
            intent: ActionIntent {
                button_id: cell.id.clone(),
                action_kind: kind,
                action_payload: cell.action_payload.clone(),
            },
        }))
    }

    /// Applique une frame serveur ; renvoie `true` si l'affichage a changé
    pub fn apply(&mut self, message: ServerMessage, now: Instant) -> bool {
        match message {
            ServerMessage::Event(event) => self.apply_event(event, now),
            ServerMessage::Control(ControlMessage::Error(err)) => {
                warn!(code = %err.code, "server rejected a frame: {}", err.message);
                self.last_error = Some(err.message);
                false
            }
            ServerMessage::Control(_) => false,
        }
    }

    fn apply_event(&mut self, event: BroadcastEvent, now: Instant) -> bool {
        match event {
            // un pulse en cours (appui local) n'est jamais prolongé par l'écho serveur
            BroadcastEvent::ButtonPressed(echo) => match self.cell_mut(&echo.button_id) {
                Some(cell) if !cell.is_pulsing(now) => {
                    cell.pulse(now);
                    true
                }
                _ => false,
            },
            BroadcastEvent::ButtonFeedback(feedback) => match self.cell_mut(&feedback.button_id) {
                Some(cell) => {
                    cell.status = Some(feedback.status);
                    cell.status_message = Some(feedback.message);
                    true
                }
                // bouton d'une autre page ou hors grille
                None => {
                    debug!(button = %feedback.button_id, "feedback for a button not rendered");
                    false
                }
            },
            BroadcastEvent::TelemetryUpdate(sample) => {
                let mut changed = false;
                for cell in self.cells.iter_mut() {
                    let Some(value) = cell.metric.and_then(|metric| metric.read(&sample)) else {
                        continue;
                    };
                    cell.widget_value = Some(format!("{value}%"));
                    changed = true;
                }
                self.last_sample = Some(sample);
                changed
            }
        }
    }

    /// Rendu texte de la grille (client headless)
    pub fn render_text(&self, now: Instant) -> String {
        let cols = usize::from(self.layout.cols()).max(1);
        let mut out = format!("[{}] page={} layout={}\n", self.state_label(), self.page_id, self.layout);
        for row in self.cells.chunks(cols) {
            let line: Vec<String> = row
                .iter()
                .map(|cell| {
                    let mut text = match &cell.widget_value {
                        Some(value) => format!("{} {}", cell.label, value),
                        None => cell.label.clone(),
                    };
                    match cell.status {
                        Some(FeedbackStatus::Success) => text.push_str(" ✓"),
                        Some(FeedbackStatus::Failure) => text.push_str(" ✗"),
                        None => {}
                    }
                    if cell.is_pulsing(now) {
                        text = format!("*{text}*");
                    }
                    format!("{text:^16}")
                })
                .collect();
            out.push_str(&line.join("|"));
            out.push('\n');
        }
        if let Some(sample) = &self.last_sample {
            out.push_str(&format!(
                "CPU: {}% | RAM: {}%\n",
                sample.cpu_usage.unwrap_or_default(),
                sample.memory_usage.unwrap_or_default()
            ));
        }
        out
    }

    fn state_label(&self) -> String {
        match self.state {
            ConnectionState::Disconnected => "disconnected".into(),
            ConnectionState::Connecting => "connecting".into(),
            ConnectionState::Connected => "connected".into(),
            ConnectionState::Reconnecting { attempt } => format!("reconnecting #{attempt}"),
        }
    }
}
