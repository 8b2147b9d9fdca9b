use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use facility_twin::assembly::AssemblyState;
use facility_twin::telemetry::MetricKind;

use super::{FocusState, Tunables, UI_PANEL_WIDTH};
use crate::explode::{ExplodeRequest, ExplodeState};
use crate::scene_assembly::PartRegistry;
use crate::telemetry_feed::TelemetryFeed;

const READOUT_BASE_SIZE: f32 = 14.0;
const READOUT_PULSE_BOOST: f32 = 4.0;

pub(super) fn render_side_panel(
    mut contexts: EguiContexts,
    feed: Res<TelemetryFeed>,
    registry: Res<PartRegistry>,
    state: Res<ExplodeState>,
    mut focus: ResMut<FocusState>,
    mut request: ResMut<ExplodeRequest>,
    mut tunables: ResMut<Tunables>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    egui::SidePanel::right("facility-twin-panel")
        .exact_width(UI_PANEL_WIDTH)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Facility Digital Twin");
            ui.label(assembly_status_line(
                state.machine.state(),
                state.machine.in_flight() > 0,
            ));
            ui.separator();

            ui.label(egui::RichText::new("Live readouts").strong());
            for (kind, value) in &feed.readout.values {
                let pulse = feed.pulse_frac(*kind);
                let text = format!(
                    "{}: {} {}",
                    kind.label(),
                    format_metric_value(*kind, *value),
                    kind.unit()
                );
                let mut rich = egui::RichText::new(text).size(readout_text_size(pulse));
                if pulse > 0.0 {
                    rich = rich.strong();
                }
                ui.label(rich);
            }
            ui.separator();

            ui.label(egui::RichText::new("Equipment").strong());
            let keys: Vec<String> = registry.keys().map(str::to_string).collect();
            for key in keys {
                let selected = focus.is(&key);
                if ui.selectable_label(selected, &key).clicked() {
                    let next = if selected { None } else { Some(key.clone()) };
                    focus.set(next);
                }
            }
            ui.separator();

            if ui
                .button(explode_button_label(state.machine.state()))
                .clicked()
            {
                request.queued = true;
            }
            ui.small("E toggles the exploded view");
            ui.separator();

            let mut edited = *tunables;
            ui.add(egui::Slider::new(&mut edited.brightness, 0.2..=2.0).text("Brightness"));
            ui.add(
                egui::Slider::new(&mut edited.flame_intensity, 0.0..=2.0)
                    .text("Flame intensity"),
            );
            ui.add(
                egui::Slider::new(&mut edited.flame_turbulence, 0.0..=2.0)
                    .text("Flame turbulence"),
            );
            if edited != *tunables {
                *tunables = edited;
            }
        });
}

/// Percent and pressure metrics carry one decimal; open-ended rates round to
/// whole units.
fn format_metric_value(kind: MetricKind, value: f32) -> String {
    match kind {
        MetricKind::WaterCut | MetricKind::TankLevel | MetricKind::SeparatorPressure => {
            format!("{value:.1}")
        }
        _ => format!("{value:.0}"),
    }
}

fn explode_button_label(state: AssemblyState) -> &'static str {
    match state {
        AssemblyState::Assembled => "Explode view",
        AssemblyState::Exploded => "Assemble view",
    }
}

fn assembly_status_line(state: AssemblyState, in_flight: bool) -> String {
    match (state, in_flight) {
        (AssemblyState::Assembled, false) => "Assembly: assembled".to_string(),
        (AssemblyState::Assembled, true) => "Assembly: reassembling...".to_string(),
        (AssemblyState::Exploded, false) => "Assembly: exploded".to_string(),
        (AssemblyState::Exploded, true) => "Assembly: exploding...".to_string(),
    }
}

fn readout_text_size(pulse_frac: f32) -> f32 {
    READOUT_BASE_SIZE + READOUT_PULSE_BOOST * pulse_frac.clamp(0.0, 1.0)
}
