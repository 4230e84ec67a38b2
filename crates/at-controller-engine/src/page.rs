//! Page derivation for the renderer.

use at_controller_core::{
    AttributeStore, ControlPanel, Footer, Grid, GridCol, GridRow, HandlerBinding, Header, Link,
    Page, Props,
};
use at_controller_diagram::{Diagram, Frame, FrameKind, LinkPosition, State, TransitionKind};

use crate::config::EngineConfig;
use crate::urls::{encode_component, with_query_params};

/// Builds the page shown while `state` is current.
///
/// Links and frame handlers come from the state's exit transitions in
/// declaration order. The footer is present only when it has links and the
/// control panel only when it has content.
pub fn derive_page(
    state: &State,
    diagram: &Diagram,
    attributes: &AttributeStore,
    config: &EngineConfig,
) -> Page {
    let component = config.controller_component.as_str();
    let mut header_links = Vec::new();
    let mut footer_links = Vec::new();
    let mut control_links = Vec::new();
    let mut handlers = Vec::new();

    for transition in diagram.exit_transitions(&state.name) {
        match &transition.kind {
            TransitionKind::Link {
                label,
                position,
                icon,
            } => {
                let link = Link::trigger(component, &transition.name, label.as_str(), icon.clone());
                match position {
                    LinkPosition::Header => header_links.push(link),
                    LinkPosition::Footer => footer_links.push(link),
                    LinkPosition::Control => control_links.push(link),
                }
            }
            TransitionKind::FrameHandler { frame_id, test } => {
                handlers.push(HandlerBinding::trigger(component, &transition.name, frame_id, test));
            }
            TransitionKind::Event { .. } => {}
        }
    }

    let rows = state
        .frame_rows
        .iter()
        .map(|row| GridRow {
            props: Props::full_height(),
            cols: row
                .iter()
                .map(|frame| GridCol {
                    src: frame_src(frame, attributes, config),
                    frame_id: frame.frame_id.clone(),
                    props: Props::flex(frame.span.to_value()),
                })
                .collect(),
        })
        .collect();

    let footer = (!footer_links.is_empty()).then(|| Footer {
        links: footer_links,
    });
    let control = ControlPanel {
        label: state.control_label.clone().unwrap_or_default(),
        subtitle: state.control_subtitle.clone().unwrap_or_default(),
        links: control_links,
    };

    Page {
        grid: Grid { rows },
        header: Header {
            label: state.label.clone(),
            links: header_links,
        },
        handlers,
        footer,
        control: (!control.is_empty()).then_some(control),
    }
}

/// Resolves the URL a frame loads.
///
/// `docs` frames are wrapped in the document viewer and never carry a
/// redirect. Other frames with a redirect get the redirect target and their
/// own id written into the query string.
pub fn frame_src(frame: &Frame, attributes: &AttributeStore, config: &EngineConfig) -> String {
    let (src, redirect) = match frame.kind {
        FrameKind::Docs => {
            let docs = attributes.format(&frame.src);
            return format!("{}{}", config.docs_viewer_path, encode_component(&docs));
        }
        FrameKind::Basic => (frame.src.clone(), frame.redirect.clone()),
        FrameKind::FormatAttributes => (
            attributes.format(&frame.src),
            frame.redirect.as_deref().map(|r| attributes.format(r)),
        ),
    };

    match redirect {
        Some(redirect) => with_query_params(
            &src,
            &[
                (frame.redirect_param.as_str(), redirect.as_str()),
                (frame.frame_id_param.as_str(), frame.frame_id.as_str()),
            ],
        ),
        None => src,
    }
}
