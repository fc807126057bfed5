//! Per-video on/off control.
//!
//! The video inside the known player gets the one button in the player's
//! control bar; every other video gets a small square control right after it.

use crate::host::{NodeId, Observation, PageHost};
use crate::settings::{element_id, PipelineSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Button inside the host player's control bar
    Player,
    /// Standalone control next to the video
    Default,
}

#[derive(Debug)]
pub struct ToggleControl {
    pub node: NodeId,
    pub kind: ControlKind,
    checked: bool,
    animated_in: bool,
}

impl ToggleControl {
    /// Inject a control for `video`. `None` if its id is already in the document.
    pub fn attach(
        host: &mut dyn PageHost,
        settings: &PipelineSettings,
        video: NodeId,
        id: u64,
    ) -> Option<Self> {
        let control = match player_controls(host, settings, video) {
            Some(controls) => {
                let dom_id = &settings.player_control_id;
                if host.element_by_id(dom_id).is_some() {
                    tracing::debug!("Control {} already in document", dom_id);
                    return None;
                }

                let button = host.create_element("button");
                host.set_attribute(button, "id", dom_id);
                for class in &settings.player_control_classes {
                    host.add_class(button, class);
                }
                let icon = host.create_element("img");
                let src = host.asset_url(&settings.player_icon);
                host.set_attribute(icon, "src", &src);
                host.add_class(icon, &settings.player_icon_class);
                host.append(button, icon);
                host.prepend(controls, button);

                tracing::debug!("Player control {} attached", dom_id);
                Self::new(button, ControlKind::Player)
            }
            None => {
                let dom_id = element_id(&settings.default_control_id, id);
                if host.element_by_id(&dom_id).is_some() {
                    tracing::debug!("Control {} already in document", dom_id);
                    return None;
                }

                let container = host.create_element("div");
                host.set_attribute(container, "id", &dom_id);
                host.add_class(container, &settings.default_control_id);
                // Inner box keeps the control square
                let inner = host.create_element("div");
                let icon = host.create_element("img");
                let src = host.asset_url(&settings.default_icon);
                host.set_attribute(icon, "src", &src);
                host.append(inner, icon);
                host.append(container, inner);
                host.insert_after(video, container);

                tracing::debug!("Default control {} attached", dom_id);
                Self::new(container, ControlKind::Default)
            }
        };

        host.observe(Observation::Clicks(control.node));
        Some(control)
    }

    fn new(node: NodeId, kind: ControlKind) -> Self {
        Self {
            node,
            kind,
            checked: false,
            animated_in: false,
        }
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Initial state, no animation
    pub fn apply_default(&mut self, host: &mut dyn PageHost, settings: &PipelineSettings, checked: bool) {
        self.checked = checked;
        if checked {
            host.add_class(self.node, &settings.checked_class);
        } else {
            host.remove_class(self.node, &settings.checked_class);
        }
    }

    /// User flipped the control
    pub fn flip(&mut self, host: &mut dyn PageHost, settings: &PipelineSettings, checked: bool) {
        self.checked = checked;
        if checked {
            host.add_class(self.node, &settings.checked_class);
            host.remove_class(self.node, &settings.animate_out_class);
            host.add_class(self.node, &settings.animate_in_class);
            self.animated_in = true;
        } else {
            host.remove_class(self.node, &settings.checked_class);
            host.remove_class(self.node, &settings.animate_in_class);
            if self.animated_in {
                host.add_class(self.node, &settings.animate_out_class);
            }
            self.animated_in = false;
        }
    }
}

fn ancestors<'a>(host: &'a dyn PageHost, node: NodeId) -> impl Iterator<Item = NodeId> + 'a {
    std::iter::successors(host.parent(node), move |n| host.parent(*n))
}

/// Control bar of the player that `video` plays in, if any
fn player_controls(host: &dyn PageHost, settings: &PipelineSettings, video: NodeId) -> Option<NodeId> {
    let controls = host.query_selector(&settings.player_controls_selector)?;
    let player = ancestors(host, video).find(|n| host.has_class(*n, &settings.player_class))?;
    ancestors(host, controls).any(|n| n == player).then_some(controls)
}
