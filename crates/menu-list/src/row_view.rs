use image_loader::Bitmap;

/// Handle to a physical row view owned by the adapter. The list widget keeps these around and
/// hands them back for reuse when a row scrolls off screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RowViewId(pub u64);

/// Identifies the container a row view was created for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParentId(pub u64);

/// Image part of a row. `None` means the neutral placeholder is shown.
#[derive(Debug, Default)]
pub struct ImageSlot {
    image: Option<Bitmap>,
}

impl ImageSlot {
    pub fn set_image(&mut self, image: Option<Bitmap>) {
        self.image = image;
    }

    pub fn image(&self) -> Option<&Bitmap> {
        self.image.as_ref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.image.is_none()
    }
}

#[derive(Debug, Default)]
pub struct LabelSlot {
    text: String,
}

impl LabelSlot {
    pub fn set_text(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// References to the parts of a row view, resolved once when the view is created and reused on
/// every rebind.
#[derive(Debug, Default)]
pub struct RowViewState {
    pub image: ImageSlot,
    pub label: LabelSlot,
}

#[derive(Debug)]
pub struct RowView {
    pub(crate) parent: ParentId,
    pub(crate) state: RowViewState,
    /// Bumped on every bind. A finished fetch is only applied if it still carries the current value.
    pub(crate) generation: u64,
    pub(crate) position: Option<usize>,
}

impl RowView {
    /// Creates a row from the fixed row template: empty label, placeholder image.
    pub(crate) fn inflate(parent: ParentId) -> Self {
        Self {
            parent,
            state: RowViewState::default(),
            generation: 0,
            position: None,
        }
    }

    pub fn parent(&self) -> ParentId {
        self.parent
    }

    pub fn state(&self) -> &RowViewState {
        &self.state
    }

    pub fn label(&self) -> &str {
        self.state.label.text()
    }

    pub fn image(&self) -> Option<&Bitmap> {
        self.state.image.image()
    }

    /// Data position this view currently shows
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
