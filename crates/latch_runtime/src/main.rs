//! Latch Engine Runtime
//!
//! Minimal binary that drives a simulated frame loop through a host buffer.
//!
//! Usage: `latch [settings.json]`

use anyhow::{Context, Result};
use latch_core::memory::{HeapAllocator, HostBuffer};
use latch_services::settings::SimulationSettings;
use std::path::PathBuf;
use std::sync::Arc;

/// Vertices uploaded per draw call.
const BATCH_VERTICES: usize = 10_000;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniforms {
    time: f32,
    frame: u32,
    _padding: [u32; 2],
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Latch Engine v{}", latch_core::VERSION);

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings =
        latch_services::init_services(path.as_deref()).context("failed to load settings")?;

    let allocator = Arc::new(HeapAllocator::new());
    let mut host_buffer = HostBuffer::with_config(allocator.clone(), settings.host_buffer)
        .context("failed to create host buffer")?;

    let simulation = &settings.simulation;
    for frame in 0..simulation.frames {
        let vertex_count = vertices_for_frame(simulation, frame);
        let vertices = build_vertices(frame, vertex_count);

        let mut draws = 0usize;
        let mut dropped = 0usize;
        for batch in vertices.chunks(BATCH_VERTICES) {
            if host_buffer.emplace_slice(batch).is_valid() {
                draws += 1;
            } else {
                dropped += 1;
            }
        }

        let uniforms = FrameUniforms {
            time: frame as f32 / 60.0,
            frame,
            _padding: [0; 2],
        };
        if !host_buffer.emplace_uniform(&uniforms).is_valid() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(frame, dropped, "host buffer could not place all frame data");
        }

        let state = host_buffer.state();
        tracing::info!(
            frame,
            vertices = vertex_count,
            draws,
            active_block = state.current_block,
            blocks = state.total_block_count,
            frame_bytes = host_buffer.usage().frame_bytes(),
            live_bytes = allocator.live_bytes(),
            "frame encoded"
        );

        host_buffer.reset();
    }

    tracing::info!(
        blocks = host_buffer.block_count(),
        live_bytes = allocator.live_bytes(),
        trailing_peak_bytes = host_buffer.usage().trailing_peak_bytes(),
        "simulation finished"
    );

    Ok(())
}

fn vertices_for_frame(simulation: &SimulationSettings, frame: u32) -> usize {
    if frame < simulation.burst_frames {
        simulation.burst_vertices as usize
    } else {
        simulation.idle_vertices as usize
    }
}

fn build_vertices(frame: u32, count: usize) -> Vec<Vertex> {
    let phase = frame as f32 * 0.1;
    (0..count)
        .map(|i| {
            let t = i as f32 / count.max(1) as f32;
            Vertex {
                position: [t * 2.0 - 1.0, (t * std::f32::consts::TAU + phase).sin() * 0.5, 0.0],
                color: [t, 1.0 - t, 0.5],
            }
        })
        .collect()
}
