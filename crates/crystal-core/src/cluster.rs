//! The crystal cluster: owns every per-track object and drives the five
//! components once per frame in a fixed order (spectrum, pulse, uniforms,
//! hover, rotation).

use crate::error::ClusterError;
use crate::events::ClusterEvent;
use crate::interaction::{pick_nearest, HoverConfig, HoverController, PickTarget};
use crate::layout::{layout_cluster, LayoutConfig};
use crate::pulse::{PulseConfig, PulseStats, PulsationEngine};
use crate::rotation::{RotationConfig, RotationController, RotationPhase};
use crate::scheduler::TaskHandle;
use crate::spectrum::{AudioSource, SpectrumConfig, SpectrumAnalyzer, SpectrumLevels, SpectrumMode};
use crate::state::Camera;
use crate::track::{CrystalObject, TrackRecord};
use crate::uniforms::{CrystalUniforms, ShaderUniformSink};
use fnv::FnvHashMap;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterConfig {
    pub layout: LayoutConfig,
    pub pulse: PulseConfig,
    pub spectrum: SpectrumConfig,
    pub hover: HoverConfig,
    pub rotation: RotationConfig,
    /// Fixed seed for layout, phases and fallback noise. `None` draws one
    /// from the OS, so every build looks different.
    pub seed: Option<u64>,
}

impl ClusterConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        self.layout
            .check()
            .and_then(|_| self.pulse.check())
            .and_then(|_| self.spectrum.check())
            .and_then(|_| self.hover.check())
            .and_then(|_| self.rotation.check())
            .map_err(ClusterError::InvalidConfig)
    }
}

/// Everything a frame needs from the outside world.
pub struct FrameInput<'a> {
    pub dt_ms: f32,
    pub camera: &'a Camera,
    /// True while the camera controller is animating a focus transition.
    pub focus_animating: bool,
    /// The element currently playing, if any.
    pub audio: Option<&'a mut dyn AudioSource>,
}

// Derive independent sub-seeds from the base seed
#[inline]
fn sub_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct CrystalCluster<M: ShaderUniformSink> {
    cfg: ClusterConfig,
    tracks: Vec<TrackRecord>,
    objects: Vec<CrystalObject>,
    meshes: Vec<M>,
    targets: Vec<PickTarget>,
    index_by_id: FnvHashMap<String, usize>,
    spectrum: SpectrumAnalyzer,
    pulse: PulsationEngine,
    hover: HoverController,
    rotation: RotationController,
    active: Option<usize>,
    now_ms: f64,
    events: Vec<ClusterEvent>,
}

impl<M: ShaderUniformSink> CrystalCluster<M> {
    /// Lay out one crystal per track and derive their oscillators.
    /// `meshes[i]` renders `tracks[i]`.
    pub fn build(tracks: Vec<TrackRecord>, meshes: Vec<M>, cfg: ClusterConfig) -> Result<Self, ClusterError> {
        cfg.validate()?;
        if tracks.len() != meshes.len() {
            return Err(ClusterError::MeshCountMismatch {
                tracks: tracks.len(),
                meshes: meshes.len(),
            });
        }
        let tracks: Vec<TrackRecord> = tracks.iter().map(TrackRecord::sanitized).collect();
        let mut index_by_id = FnvHashMap::default();
        for (i, t) in tracks.iter().enumerate() {
            if index_by_id.insert(t.id.clone(), i).is_some() {
                return Err(ClusterError::DuplicateTrackId(t.id.clone()));
            }
        }

        let seed = cfg.seed.unwrap_or_else(rand::random);
        let mut layout_rng = StdRng::seed_from_u64(sub_seed(seed, 1));
        let positions = layout_cluster(tracks.len(), &cfg.layout, &mut layout_rng);
        let mut objects: Vec<CrystalObject> = tracks
            .iter()
            .zip(positions)
            .enumerate()
            .map(|(i, (t, p))| {
                let mut o = CrystalObject::new(i, t, p);
                o.emissive = cfg.hover.base_emissive;
                o
            })
            .collect();

        let mut pulse = PulsationEngine::new(cfg.pulse.clone(), sub_seed(seed, 2));
        pulse.initialize(&mut objects, &tracks);

        let targets = objects
            .iter()
            .zip(&meshes)
            .map(|(o, m)| PickTarget {
                center: o.position,
                radius: m.bounding_radius() * o.base_scale,
            })
            .collect();

        log::info!("[cluster] built {} crystals (seed {seed})", objects.len());
        Ok(Self {
            spectrum: SpectrumAnalyzer::new(cfg.spectrum.clone(), sub_seed(seed, 3)),
            hover: HoverController::new(cfg.hover.clone(), objects.len()),
            rotation: RotationController::new(cfg.rotation.clone()),
            pulse,
            cfg,
            tracks,
            objects,
            meshes,
            targets,
            index_by_id,
            active: None,
            now_ms: 0.0,
            events: Vec::new(),
        })
    }

    /// Replace the whole cluster. Sync groups, hover and rotation start over.
    /// `source` is the currently tapped audio, disconnected before the swap.
    /// On error the old cluster is left untouched.
    pub fn rebuild(
        &mut self,
        tracks: Vec<TrackRecord>,
        meshes: Vec<M>,
        source: Option<&mut dyn AudioSource>,
    ) -> Result<(), ClusterError> {
        let fresh = Self::build(tracks, meshes, self.cfg.clone())?;
        self.dispose(source);
        *self = fresh;
        Ok(())
    }

    /// Advance one frame.
    pub fn update(&mut self, frame: FrameInput<'_>) {
        let FrameInput {
            dt_ms,
            camera,
            focus_animating,
            audio,
        } = frame;
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.now_ms += dt_ms as f64;

        let mode_before = self.spectrum.mode();
        let levels = self.spectrum.update(audio, dt_ms);
        self.note_mode_change(mode_before);

        self.pulse.update(dt_ms, &mut self.objects);
        self.push_uniforms(levels);

        self.hover.update(
            self.now_ms,
            &mut self.objects,
            &self.targets,
            camera,
            focus_animating,
            &mut self.events,
        );
        self.rotation.update(dt_ms, &mut self.events);
    }

    fn push_uniforms(&mut self, levels: SpectrumLevels) {
        let time = self.pulse.elapsed_sec() as f32;
        self.targets.clear();
        for (i, (obj, mesh)) in self.objects.iter().zip(self.meshes.iter_mut()).enumerate() {
            let amplitude = self.pulse.render_amplitude(obj, levels, self.active == Some(i));
            let scale = obj.base_scale * obj.hover_scale * self.pulse.scale_factor(obj, amplitude);
            mesh.set_scale(scale);
            mesh.write_uniforms(&CrystalUniforms {
                time,
                pulse: obj.pulse_value,
                amplitude,
                emissive: obj.emissive,
                bass: levels.bass,
                mid: levels.mid,
                treble: levels.treble,
                hover: if obj.is_hovered { 1.0 } else { 0.0 },
                focus: if obj.is_focused { 1.0 } else { 0.0 },
                scale,
                sharpness: obj.sharpness,
                _pad: 0.0,
                color: [obj.color[0], obj.color[1], obj.color[2], 1.0],
            });
            self.targets.push(PickTarget {
                center: self.rotation.transform_point(obj.position),
                radius: mesh.bounding_radius() * scale,
            });
        }
    }

    fn note_mode_change(&mut self, before: SpectrumMode) {
        let mode = self.spectrum.mode();
        if mode != before {
            self.events.push(ClusterEvent::SpectrumModeChanged { mode });
        }
    }

    fn lookup(&self, id: &str, what: &str) -> Option<usize> {
        let found = self.index_by_id.get(id).copied();
        if found.is_none() {
            log::warn!("[cluster] {what}: unknown track id `{id}`, ignoring");
        }
        found
    }

    // ---------------- playback lifecycle ----------------

    /// A track started playing: tap its audio and pause the spin.
    pub fn on_play_start(&mut self, id: &str, source: &mut dyn AudioSource) -> bool {
        let Some(i) = self.lookup(id, "play start") else {
            return false;
        };
        let before = self.spectrum.mode();
        self.active = Some(i);
        self.spectrum.connect(source);
        self.note_mode_change(before);
        self.rotation.pause_for_audio();
        log::info!("[cluster] playing `{id}`");
        true
    }

    pub fn on_play_end(&mut self, id: &str, source: Option<&mut dyn AudioSource>) -> bool {
        if !self.is_active(id, "play end") {
            return false;
        }
        self.finish_playback(source);
        true
    }

    pub fn on_error(&mut self, id: &str, message: &str, source: Option<&mut dyn AudioSource>) -> bool {
        if !self.is_active(id, "playback error") {
            return false;
        }
        log::warn!("[cluster] playback error on `{id}`: {message}");
        self.finish_playback(source);
        true
    }

    fn is_active(&self, id: &str, what: &str) -> bool {
        match self.lookup(id, what) {
            Some(i) if self.active == Some(i) => true,
            Some(_) => {
                log::warn!("[cluster] {what}: `{id}` is not the playing track, ignoring");
                false
            }
            None => false,
        }
    }

    fn finish_playback(&mut self, source: Option<&mut dyn AudioSource>) {
        let before = self.spectrum.mode();
        self.spectrum.disconnect(source);
        self.note_mode_change(before);
        self.active = None;
        self.rotation.handle_playback_finished();
    }

    // ---------------- pointer ----------------

    pub fn pointer_move(&mut self, ndc: Vec2) {
        self.hover.pointer_move(ndc);
    }

    /// Resolve a click. Returns the clicked crystal's id; a click that misses
    /// every crystal outside a camera zoom releases an audio pause.
    pub fn pointer_click(&mut self, ndc: Vec2, camera: &Camera, focus_animating: bool) -> Option<String> {
        let hit = pick_nearest(camera, ndc, &self.targets);
        let id = hit.map(|i| self.objects[i].id.clone());
        if let Some(id) = &id {
            self.events.push(ClusterEvent::Clicked { id: id.clone() });
        }
        self.rotation.handle_click(hit.is_some(), focus_animating);
        id
    }

    pub fn set_focus(&mut self, id: &str, focused: bool) -> bool {
        let Some(i) = self.lookup(id, "focus") else {
            return false;
        };
        self.hover.set_focused(&mut self.objects, i, focused, &mut self.events)
    }

    /// Drop the current hover, e.g. when the pointer leaves the canvas.
    pub fn clear_hover(&mut self) {
        self.hover.clear(self.now_ms, &mut self.objects, &mut self.events);
    }

    // ---------------- pulsation ----------------

    pub fn set_track_tempo(&mut self, id: &str, bpm: Option<f32>) -> bool {
        let Some(i) = self.lookup(id, "tempo") else {
            return false;
        };
        self.pulse.set_from_tempo(&mut self.objects[i], &self.tracks[i], bpm);
        true
    }

    pub fn set_global_speed_multiplier(&mut self, k: f32) {
        self.pulse.set_global_speed_multiplier(&mut self.objects, k);
    }

    pub fn set_global_amplitude_multiplier(&mut self, k: f32) {
        self.pulse.set_global_amplitude_multiplier(&mut self.objects, k);
    }

    // ---------------- rotation ----------------

    pub fn pause_rotation(&mut self) {
        self.rotation.pause();
    }

    pub fn resume_rotation(&mut self) {
        self.rotation.resume();
    }

    pub fn pause_rotation_for_audio(&mut self) {
        self.rotation.pause_for_audio();
    }

    pub fn resume_rotation_from_audio(&mut self) -> bool {
        self.rotation.resume_from_audio()
    }

    pub fn pause_rotation_with_delay(&mut self, delay_ms: f32) -> TaskHandle {
        self.rotation.pause_with_delay(delay_ms)
    }

    // ---------------- queries ----------------

    pub fn pulse_stats(&self) -> PulseStats {
        self.pulse.stats(&self.objects)
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation.speed()
    }

    pub fn rotation_target_speed(&self) -> f32 {
        self.rotation.target_speed()
    }

    pub fn rotation_phase(&self) -> RotationPhase {
        self.rotation.phase()
    }

    pub fn is_rotation_paused(&self) -> bool {
        self.rotation.is_paused()
    }

    pub fn hovered_object(&self) -> Option<&CrystalObject> {
        self.hover.hovered().and_then(|i| self.objects.get(i))
    }

    pub fn object(&self, id: &str) -> Option<&CrystalObject> {
        self.index_by_id.get(id).map(|&i| &self.objects[i])
    }

    pub fn objects(&self) -> &[CrystalObject] {
        &self.objects
    }

    pub fn meshes(&self) -> &[M] {
        &self.meshes
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn sync_group_count(&self) -> usize {
        self.pulse.sync_groups().len()
    }

    pub fn spectrum_levels(&self) -> SpectrumLevels {
        self.spectrum.levels()
    }

    pub fn spectrum_mode(&self) -> SpectrumMode {
        self.spectrum.mode()
    }

    pub fn is_using_fallback(&self) -> bool {
        self.spectrum.is_using_fallback()
    }

    pub fn active_track(&self) -> Option<&str> {
        self.active.map(|i| self.objects[i].id.as_str())
    }

    /// Current world position of crystal `index` (layout position rotated
    /// with the cluster).
    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.objects
            .get(index)
            .map(|o| self.rotation.transform_point(o.position))
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ClusterEvent> {
        self.events.drain(..)
    }

    /// Cancel timers and hooks, drop the audio tap and any hover.
    pub fn dispose(&mut self, source: Option<&mut dyn AudioSource>) {
        self.rotation.dispose();
        self.spectrum.disconnect(source);
        self.hover.clear(self.now_ms, &mut self.objects, &mut self.events);
        self.active = None;
        log::debug!("[cluster] disposed");
    }
}
