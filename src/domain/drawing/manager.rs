use super::entities::{Drawing, DrawingKind, DrawingShape, DrawingStyle};
use super::hit_test::{HitTolerance, anchor_at, hits};
use crate::domain::chart::{CanvasPoint, ChartPoint, CoordinateSystem};
use crate::domain::errors::DrawingError;
use crate::domain::events::{DomainEvent, EventBus};
use crate::domain::logging::{LogComponent, get_time_provider};
use crate::log_debug;

/// Interaction state machine
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    /// Collecting points for the active tool
    Creating,
    Selected,
    /// Moving the selected drawing; `origin` is where the pointer went down
    Dragging { origin: ChartPoint, snapshot: Vec<ChartPoint> },
    /// Moving one anchor of the selected drawing
    Resizing { anchor: usize, snapshot: Vec<ChartPoint> },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Creating => "creating",
            Self::Selected => "selected",
            Self::Dragging { .. } => "dragging",
            Self::Resizing { .. } => "resizing",
        }
    }
}

/// Everything the manager knows; the single source of truth for drawings
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingManagerState {
    pub drawings: Vec<Drawing>,
    pub active_tool: Option<DrawingKind>,
    pub selected_id: Option<String>,
    pub interaction: InteractionState,
    pub temp_points: Vec<ChartPoint>,
    pub hovered_id: Option<String>,
    pub hovered_anchor: Option<usize>,
}

impl Default for DrawingManagerState {
    fn default() -> Self {
        Self {
            drawings: Vec::new(),
            active_tool: None,
            selected_id: None,
            interaction: InteractionState::Idle,
            temp_points: Vec::new(),
            hovered_id: None,
            hovered_anchor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawingEvent {
    Created(Drawing),
    Updated(Drawing),
    Deleted { id: String },
    SelectionChanged { id: Option<String> },
    Cleared,
    Imported { count: usize },
    StateChanged { state: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawingEventKind {
    Created,
    Updated,
    Deleted,
    SelectionChanged,
    Cleared,
    Imported,
    StateChanged,
}

impl DomainEvent for DrawingEvent {
    type Kind = DrawingEventKind;

    fn kind(&self) -> DrawingEventKind {
        match self {
            Self::Created(_) => DrawingEventKind::Created,
            Self::Updated(_) => DrawingEventKind::Updated,
            Self::Deleted { .. } => DrawingEventKind::Deleted,
            Self::SelectionChanged { .. } => DrawingEventKind::SelectionChanged,
            Self::Cleared => DrawingEventKind::Cleared,
            Self::Imported { .. } => DrawingEventKind::Imported,
            Self::StateChanged { .. } => DrawingEventKind::StateChanged,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "DrawingCreated",
            Self::Updated(_) => "DrawingUpdated",
            Self::Deleted { .. } => "DrawingDeleted",
            Self::SelectionChanged { .. } => "DrawingSelectionChanged",
            Self::Cleared => "DrawingsCleared",
            Self::Imported { .. } => "DrawingsImported",
            Self::StateChanged { .. } => "DrawingStateChanged",
        }
    }
}

/// Single writer of the drawing collection. Every mutation publishes a `DrawingEvent`
/// before returning.
#[derive(Debug)]
pub struct DrawingManager {
    state: DrawingManagerState,
    events: EventBus<DrawingEvent>,
    tolerance: HitTolerance,
    next_id: u64,
    pending_text: String,
}

impl Default for DrawingManager {
    fn default() -> Self {
        Self::new(HitTolerance::default())
    }
}

impl DrawingManager {
    pub fn new(tolerance: HitTolerance) -> Self {
        Self {
            state: DrawingManagerState::default(),
            events: EventBus::new(),
            tolerance,
            next_id: 0,
            pending_text: "Text".to_string(),
        }
    }

    pub fn state(&self) -> &DrawingManagerState {
        &self.state
    }

    pub fn events(&mut self) -> &mut EventBus<DrawingEvent> {
        &mut self.events
    }

    pub fn drawings(&self) -> &[Drawing] {
        &self.state.drawings
    }

    pub fn get(&self, id: &str) -> Option<&Drawing> {
        self.state.drawings.iter().find(|d| d.id == id)
    }

    pub fn selected(&self) -> Option<&Drawing> {
        self.state.selected_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn tolerance(&self) -> HitTolerance {
        self.tolerance
    }

    /// Drawings in paint order, lowest z first
    pub fn paint_order(&self) -> Vec<&Drawing> {
        let mut ordered: Vec<&Drawing> = self.state.drawings.iter().filter(|d| d.visible).collect();
        ordered.sort_by_key(|d| d.z_index);
        ordered
    }

    fn set_interaction(&mut self, interaction: InteractionState) {
        if self.state.interaction != interaction {
            let changed = std::mem::discriminant(&self.state.interaction) != std::mem::discriminant(&interaction);
            self.state.interaction = interaction;
            if changed {
                let state = self.state.interaction.name();
                log_debug!(LogComponent::Domain("DrawingManager"), "state -> {}", state);
                self.events.publish(&DrawingEvent::StateChanged { state });
            }
        }
    }

    fn index_of(&self, id: &str) -> Result<usize, DrawingError> {
        self.state
            .drawings
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| DrawingError::NotFound(id.to_string()))
    }

    fn mutable(&mut self, id: &str) -> Result<&mut Drawing, DrawingError> {
        let index = self.index_of(id)?;
        let drawing = &mut self.state.drawings[index];
        if drawing.locked {
            return Err(DrawingError::Locked(id.to_string()));
        }
        Ok(drawing)
    }

    fn touch_and_publish(&mut self, id: &str) {
        let now = get_time_provider().current_timestamp();
        if let Some(drawing) = self.state.drawings.iter_mut().find(|d| d.id == id) {
            drawing.updated_at = now;
            let snapshot = drawing.clone();
            self.events.publish(&DrawingEvent::Updated(snapshot));
        }
    }

    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    /// Text placed by the next text drawing
    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = text.into();
    }

    /// Arm a tool (enter CREATING) or disarm with `None`
    pub fn set_active_tool(&mut self, tool: Option<DrawingKind>) {
        self.state.temp_points.clear();
        self.state.active_tool = tool;
        match tool {
            Some(_) => {
                self.clear_selection();
                self.set_interaction(InteractionState::Creating);
            }
            None if self.state.interaction == InteractionState::Creating => {
                self.set_interaction(InteractionState::Idle)
            }
            None => {}
        }
    }

    /// Append a point for the active tool. Returns the new drawing id once the tool's
    /// cardinality is reached.
    pub fn add_point(&mut self, point: ChartPoint) -> Result<Option<String>, DrawingError> {
        let kind = match (&self.state.interaction, self.state.active_tool) {
            (InteractionState::Creating, Some(kind)) => kind,
            (state, _) => return Err(DrawingError::InvalidState(state.name().to_string())),
        };
        if !point.is_finite() {
            return Err(DrawingError::InvalidState("non-finite point".into()));
        }
        self.state.temp_points.push(point);
        if self.state.temp_points.len() < kind.point_count() {
            return Ok(None);
        }

        let text = (kind == DrawingKind::Text).then(|| self.pending_text.clone());
        let shape = DrawingShape::from_points(kind, &self.state.temp_points, text)?;
        let id = self.allocate_id(kind);
        let drawing = Drawing::new(
            id.clone(),
            shape,
            self.state.drawings.len(),
            get_time_provider().current_timestamp(),
        );
        self.state.drawings.push(drawing.clone());
        self.state.temp_points.clear();
        self.state.active_tool = None;
        self.set_interaction(InteractionState::Idle);
        log_debug!(LogComponent::Domain("DrawingManager"), "created {}", id);
        self.events.publish(&DrawingEvent::Created(drawing));
        Ok(Some(id))
    }

    /// Escape: abandon creation, restore a drag in progress, or drop the selection
    pub fn cancel(&mut self) {
        match self.state.interaction.clone() {
            InteractionState::Creating => self.set_active_tool(None),
            InteractionState::Dragging { snapshot, .. } | InteractionState::Resizing { snapshot, .. } => {
                if let Some(id) = self.state.selected_id.clone() {
                    if let Some(drawing) = self.state.drawings.iter_mut().find(|d| d.id == id) {
                        drawing.shape.points_mut().copy_from_slice(&snapshot);
                    }
                    self.touch_and_publish(&id);
                }
                self.set_interaction(InteractionState::Selected);
            }
            InteractionState::Selected => {
                self.clear_selection();
                self.set_interaction(InteractionState::Idle);
            }
            InteractionState::Idle => {}
        }
    }

    /// Topmost visible drawing under `pixel`
    pub fn hit_test(&self, pixel: CanvasPoint, cs: &CoordinateSystem<'_>) -> Option<String> {
        self.paint_order()
            .into_iter()
            .rev()
            .find(|d| hits(d, pixel, cs, &self.tolerance))
            .map(|d| d.id.clone())
    }

    /// Anchor of the selected drawing under `pixel`
    pub fn hit_test_anchor(&self, pixel: CanvasPoint, cs: &CoordinateSystem<'_>) -> Option<(String, usize)> {
        let drawing = self.selected().filter(|d| d.visible)?;
        anchor_at(drawing, pixel, cs, self.tolerance.anchor).map(|anchor| (drawing.id.clone(), anchor))
    }

    /// Track hover for cursor feedback. Returns true when the hover target changed.
    pub fn update_hover(&mut self, pixel: CanvasPoint, cs: &CoordinateSystem<'_>) -> bool {
        let anchor = self.hit_test_anchor(pixel, cs);
        let hovered_id = anchor.as_ref().map(|(id, _)| id.clone()).or_else(|| self.hit_test(pixel, cs));
        let hovered_anchor = anchor.map(|(_, i)| i);
        let changed = hovered_id != self.state.hovered_id || hovered_anchor != self.state.hovered_anchor;
        self.state.hovered_id = hovered_id;
        self.state.hovered_anchor = hovered_anchor;
        changed
    }

    pub fn clear_hover(&mut self) -> bool {
        let changed = self.state.hovered_id.is_some() || self.state.hovered_anchor.is_some();
        self.state.hovered_id = None;
        self.state.hovered_anchor = None;
        changed
    }

    pub fn select(&mut self, id: Option<&str>) -> Result<(), DrawingError> {
        match id {
            Some(id) => {
                self.index_of(id)?;
                self.state.temp_points.clear();
                self.state.active_tool = None;
                if self.state.selected_id.as_deref() != Some(id) {
                    self.state.selected_id = Some(id.to_string());
                    self.events.publish(&DrawingEvent::SelectionChanged { id: Some(id.to_string()) });
                }
                self.set_interaction(InteractionState::Selected);
            }
            None => {
                self.clear_selection();
                if self.state.interaction != InteractionState::Creating {
                    self.set_interaction(InteractionState::Idle);
                }
            }
        }
        Ok(())
    }

    fn clear_selection(&mut self) {
        if self.state.selected_id.take().is_some() {
            self.events.publish(&DrawingEvent::SelectionChanged { id: None });
        }
    }

    /// SELECTED -> DRAGGING for the selected drawing
    pub fn begin_drag(&mut self, origin: ChartPoint) -> Result<(), DrawingError> {
        let snapshot = self.begin_edit()?;
        self.set_interaction(InteractionState::Dragging { origin, snapshot });
        Ok(())
    }

    /// SELECTED -> RESIZING on `anchor` of the selected drawing
    pub fn begin_resize(&mut self, anchor: usize) -> Result<(), DrawingError> {
        let snapshot = self.begin_edit()?;
        if anchor >= snapshot.len() {
            let id = self.state.selected_id.clone().unwrap_or_default();
            return Err(DrawingError::AnchorOutOfRange { id, anchor });
        }
        self.set_interaction(InteractionState::Resizing { anchor, snapshot });
        Ok(())
    }

    fn begin_edit(&mut self) -> Result<Vec<ChartPoint>, DrawingError> {
        if self.state.interaction != InteractionState::Selected {
            return Err(DrawingError::InvalidState(self.state.interaction.name().to_string()));
        }
        let id = self.state.selected_id.clone().ok_or_else(|| DrawingError::InvalidState("no selection".into()))?;
        Ok(self.mutable(&id)?.points().to_vec())
    }

    /// Pointer moved while DRAGGING or RESIZING
    pub fn drag_to(&mut self, current: ChartPoint) -> Result<(), DrawingError> {
        let id = self.state.selected_id.clone().ok_or_else(|| DrawingError::InvalidState("no selection".into()))?;
        match self.state.interaction.clone() {
            InteractionState::Dragging { origin, snapshot } => {
                let (dt, dp) = (current.timestamp - origin.timestamp, current.price - origin.price);
                let drawing = self.mutable(&id)?;
                for (point, original) in drawing.shape.points_mut().iter_mut().zip(&snapshot) {
                    *point = original.translate(dt, dp);
                }
            }
            InteractionState::Resizing { anchor, .. } => self.mutable(&id)?.set_point(anchor, current)?,
            other => return Err(DrawingError::InvalidState(other.name().to_string())),
        }
        self.touch_and_publish(&id);
        Ok(())
    }

    /// DRAGGING/RESIZING -> SELECTED
    pub fn end_interaction(&mut self) {
        if matches!(self.state.interaction, InteractionState::Dragging { .. } | InteractionState::Resizing { .. }) {
            self.set_interaction(InteractionState::Selected);
        }
    }

    pub fn move_drawing(&mut self, id: &str, delta_time: f64, delta_price: f64) -> Result<(), DrawingError> {
        self.mutable(id)?.translate(delta_time, delta_price);
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn resize_drawing(&mut self, id: &str, anchor: usize, point: ChartPoint) -> Result<(), DrawingError> {
        self.mutable(id)?.set_point(anchor, point)?;
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn update_style(&mut self, id: &str, style: DrawingStyle) -> Result<(), DrawingError> {
        self.mutable(id)?.style = style;
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn set_locked(&mut self, id: &str, locked: bool) -> Result<(), DrawingError> {
        let index = self.index_of(id)?;
        self.state.drawings[index].locked = locked;
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) -> Result<(), DrawingError> {
        let index = self.index_of(id)?;
        self.state.drawings[index].visible = visible;
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn bring_to_front(&mut self, id: &str) -> Result<(), DrawingError> {
        let index = self.index_of(id)?;
        let top = self.state.drawings.iter().map(|d| d.z_index).max().unwrap_or(0);
        if self.state.drawings[index].z_index != top || self.state.drawings.iter().filter(|d| d.z_index == top).count() > 1
        {
            self.state.drawings[index].z_index = top + 1;
        }
        self.touch_and_publish(id);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<Drawing, DrawingError> {
        self.mutable(id)?;
        let index = self.index_of(id)?;
        let removed = self.state.drawings.remove(index);
        if self.state.selected_id.as_deref() == Some(id) {
            self.clear_selection();
            self.set_interaction(InteractionState::Idle);
        }
        if self.state.hovered_id.as_deref() == Some(id) {
            self.clear_hover();
        }
        self.events.publish(&DrawingEvent::Deleted { id: id.to_string() });
        Ok(removed)
    }

    pub fn clear_all(&mut self) {
        self.state.drawings.clear();
        self.state.temp_points.clear();
        self.state.active_tool = None;
        self.clear_selection();
        self.clear_hover();
        self.set_interaction(InteractionState::Idle);
        self.events.publish(&DrawingEvent::Cleared);
    }

    /// Next `<kind>-<n>` id not already taken
    fn allocate_id(&mut self, kind: DrawingKind) -> String {
        loop {
            self.next_id += 1;
            let id = format!("{}-{}", kind, self.next_id);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Swap in a validated collection; used by import
    pub(crate) fn replace_all(&mut self, mut drawings: Vec<Drawing>) {
        drawings.sort_by_key(|d| d.z_index);
        let count = drawings.len();
        // numbering continues after the highest imported suffix
        let highest = drawings
            .iter()
            .filter_map(|d| d.id.rsplit_once('-').and_then(|(_, n)| n.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(highest);
        self.state.drawings = drawings;
        self.state.temp_points.clear();
        self.state.active_tool = None;
        self.clear_selection();
        self.clear_hover();
        self.set_interaction(InteractionState::Idle);
        self.events.publish(&DrawingEvent::Imported { count });
    }
}
