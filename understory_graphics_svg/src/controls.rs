// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback controls appended below an animation.

use crate::fmt::{self, num};
use crate::xml::Element;

/// Height of the control bar added below the animation.
pub(crate) const BAR_HEIGHT: f64 = 24.0;

const BUTTON_SIZE: f64 = 16.0;
const PADDING: f64 = 4.0;
const TRACK_HEIGHT: f64 = 4.0;

/// Appends a play/pause button, a scrubber track with a progress bar, and
/// the script driving them. `top` is the height of the animation itself and
/// `total` its duration in milliseconds.
pub(crate) fn append(root: &mut Element, width: f64, top: f64, total: f64, prefix: &str) {
    let id = |name: &str| format!("{prefix}controls_{name}");
    let track_x = PADDING * 3.0 + BUTTON_SIZE;
    let track_width = (width - track_x - PADDING * 2.0).max(0.0);
    let track_y = (BAR_HEIGHT - TRACK_HEIGHT) * 0.5;

    let pause = Element::new("path")
        .with_attr("id", id("pause"))
        .with_attr("d", "M 4 3 L 7 3 L 7 13 L 4 13 Z M 9 3 L 12 3 L 12 13 L 9 13 Z")
        .with_attr("fill", "#ffffff");
    let play = Element::new("path")
        .with_attr("id", id("play"))
        .with_attr("d", "M 4 3 L 13 8 L 4 13 Z")
        .with_attr("fill", "#ffffff")
        .with_attr("display", "none");
    let button = Element::new("g")
        .with_attr("id", id("button"))
        .with_attr("cursor", "pointer")
        .with_attr(
            "transform",
            format!("translate({} {})", num(PADDING * 2.0), num((BAR_HEIGHT - BUTTON_SIZE) * 0.5)),
        )
        .with_child(
            Element::new("rect")
                .with_attr("width", num(BUTTON_SIZE))
                .with_attr("height", num(BUTTON_SIZE))
                .with_attr("rx", "2")
                .with_attr("fill", "#444444"),
        )
        .with_child(pause)
        .with_child(play);

    let progress = Element::new("rect")
        .with_attr("x", num(track_x))
        .with_attr("y", num(track_y))
        .with_attr("width", "0")
        .with_attr("height", num(TRACK_HEIGHT))
        .with_attr("fill", "#4a90d9")
        .with_attr("pointer-events", "none")
        .with_child(
            Element::new("animate")
                .with_attr("attributeName", "width")
                .with_attr("from", "0")
                .with_attr("to", num(track_width))
                .with_attr("dur", fmt::seconds(total))
                .with_attr("repeatCount", "indefinite"),
        );
    let track = Element::new("rect")
        .with_attr("id", id("track"))
        .with_attr("x", num(track_x))
        .with_attr("y", num(track_y))
        .with_attr("width", num(track_width))
        .with_attr("height", num(TRACK_HEIGHT))
        .with_attr("fill", "#cccccc")
        .with_attr("cursor", "pointer");

    let bar = Element::new("g")
        .with_attr("id", id("bar"))
        .with_attr("transform", format!("translate(0 {})", num(top)))
        .with_child(
            Element::new("rect")
                .with_attr("width", num(width))
                .with_attr("height", num(BAR_HEIGHT))
                .with_attr("fill", "#eeeeee"),
        )
        .with_child(button)
        .with_child(track)
        .with_child(progress);
    root.push(bar);

    let mut script = Element::new("script").with_attr("type", "text/javascript");
    script.push_text(script_source(prefix, total));
    root.push(script);
}

/// The control script. It avoids `<` and `&` so it needs no escaping.
fn script_source(prefix: &str, total: f64) -> String {
    let seconds = num(total / 1000.0);
    format!(
        r#"(function () {{
  var svg = document.documentElement;
  var playing = true;
  function byId(name) {{ return document.getElementById('{prefix}controls_' + name); }}
  var pause = byId('pause');
  var play = byId('play');
  var track = byId('track');
  function show() {{
    pause.setAttribute('display', playing ? 'inline' : 'none');
    play.setAttribute('display', playing ? 'none' : 'inline');
  }}
  byId('button').addEventListener('click', function () {{
    if (playing) {{ svg.pauseAnimations(); }} else {{ svg.unpauseAnimations(); }}
    playing = !playing;
    show();
  }});
  track.addEventListener('click', function (event) {{
    var box = track.getBoundingClientRect();
    var f = Math.min(Math.max((event.clientX - box.left) / box.width, 0), 1);
    svg.setCurrentTime(f * {seconds});
  }});
  show();
}})();"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_sits_below_the_animation() {
        let mut root = Element::new("svg");
        append(&mut root, 200.0, 100.0, 1500.0, "a_");
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["g", "script"]);
        let bar = root.elements().next().unwrap();
        assert_eq!(bar.attr("transform"), Some("translate(0 100)"));
        let mut ids = Vec::new();
        bar.walk(&mut |e| ids.extend(e.attr("id")));
        assert_eq!(
            ids,
            [
                "a_controls_bar",
                "a_controls_button",
                "a_controls_pause",
                "a_controls_play",
                "a_controls_track",
            ]
        );
    }

    #[test]
    fn script_drives_the_document_clock() {
        let source = script_source("", 1500.0);
        for call in ["pauseAnimations()", "unpauseAnimations()", "setCurrentTime(f * 1.5)"] {
            assert!(source.contains(call), "missing {call}");
        }
        assert!(!source.contains('<') && !source.contains('&'));
    }
}
