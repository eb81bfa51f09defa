/// Interaction settings for the call graph view.
#[derive(Debug, Clone)]
pub struct SettingsInteraction {
    /// Per-frame nearest-node hover detection.
    pub hover_enabled: bool,
    /// Click-to-select and empty-canvas deselect.
    pub selection_enabled: bool,
    /// Alt-click follow toggling while the view is locked.
    pub follow_enabled: bool,
}

impl Default for SettingsInteraction {
    fn default() -> Self {
        Self {
            hover_enabled: true,
            selection_enabled: true,
            follow_enabled: true,
        }
    }
}

impl SettingsInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hover_enabled(mut self, v: bool) -> Self {
        self.hover_enabled = v;
        self
    }

    pub fn with_selection_enabled(mut self, v: bool) -> Self {
        self.selection_enabled = v;
        self
    }

    pub fn with_follow_enabled(mut self, v: bool) -> Self {
        self.follow_enabled = v;
        self
    }
}

/// Camera navigation settings. Speeds are tuned for the default scene scale.
#[derive(Debug, Clone)]
pub struct SettingsNavigation {
    /// Radians of orbit rotation per dragged pixel.
    pub rotate_speed: f32,
    /// Radians of free-flight look per dragged pixel.
    pub look_speed: f32,
    /// Orbit pan speed per pixel, scaled by camera distance.
    pub pan_speed: f32,
    /// Zoom factor step per scroll unit.
    pub zoom_speed: f32,
}

impl Default for SettingsNavigation {
    fn default() -> Self {
        Self {
            rotate_speed: 0.01,
            look_speed: 0.003,
            pan_speed: 0.01,
            zoom_speed: 0.1,
        }
    }
}

impl SettingsNavigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotate_speed(mut self, v: f32) -> Self {
        self.rotate_speed = v;
        self
    }

    pub fn with_look_speed(mut self, v: f32) -> Self {
        self.look_speed = v;
        self
    }

    pub fn with_zoom_speed(mut self, v: f32) -> Self {
        self.zoom_speed = v;
        self
    }
}

/// Visual encoding settings.
#[derive(Debug, Clone)]
pub struct SettingsStyle {
    /// Node radius in pixels before connectivity and depth scaling.
    pub base_node_size: f32,
    /// Opacity of nodes not reachable from the selection.
    pub unselected_opacity: f32,
    pub show_edges: bool,
    pub show_labels: bool,
    /// Labels draw only for nodes closer than this view depth.
    pub label_distance: f32,
}

impl Default for SettingsStyle {
    fn default() -> Self {
        Self {
            base_node_size: 6.0,
            unselected_opacity: 0.15,
            show_edges: true,
            show_labels: false,
            label_distance: 15.0,
        }
    }
}

impl SettingsStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_node_size(mut self, v: f32) -> Self {
        self.base_node_size = v;
        self
    }

    pub fn with_unselected_opacity(mut self, v: f32) -> Self {
        self.unselected_opacity = v;
        self
    }

    pub fn with_edges_shown(mut self, v: bool) -> Self {
        self.show_edges = v;
        self
    }

    pub fn with_labels_shown(mut self, v: bool) -> Self {
        self.show_labels = v;
        self
    }

    pub fn with_label_distance(mut self, v: f32) -> Self {
        self.label_distance = v;
        self
    }
}
