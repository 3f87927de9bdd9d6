//! Walk around a small walled arena full of wandering guards.
//!
//! ```bash
//! cargo run --release --bin view_sw -- --guards 12 --split
//! ```
//!
//! Arrows / WASD move, Space highlights the guard closest to the view
//! direction, H toggles "hide lower half" on every guard, Escape quits.

use std::{
    f32::consts::{FRAC_PI_2, TAU},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use clap::Parser;
use glam::Vec3;
use image::{Rgba as Px, RgbaImage};
use log::info;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use arena_render::{
    engine::RenderContext,
    renderer::{Renderer, RendererExt, Rgba, Scene, Software, Surface},
    world::{Camera, Ellipsoid, EllipsoidPic, Rect3, RectImage, Viewport},
};

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    #[arg(long, default_value_t = 1024)]
    width: usize,

    #[arg(long, default_value_t = 768)]
    height: usize,

    /// Image for every wall (a checkerboard otherwise)
    #[arg(long, value_name = "FILE")]
    wall_texture: Option<PathBuf>,

    /// Image wrapped around every guard (stripes otherwise)
    #[arg(long, value_name = "FILE")]
    ellipsoid_texture: Option<PathBuf>,

    /// Number of guards
    #[arg(long, default_value_t = 8)]
    guards: usize,

    /// Add a second view from the arena's corner below the first one
    #[arg(long)]
    split: bool,
}

const ARENA: f32 = 8.0;
const WALL_HEIGHT: f32 = 1.5;
const EYE_HEIGHT: f32 = 0.6;
const MOVE_SPEED: f32 = 3.0; // units / s
const TURN_SPEED: f32 = 2.0; // rad / s
const GUARD_SPEED: f32 = 0.8;
const GUARD_RADIUS: f32 = 0.35;

/*──────────────────────── procedural textures ────────────────────────*/

fn checker_wall() -> anyhow::Result<RectImage> {
    const SIDE: usize = 32;
    let pixels: Vec<Rgba> = (0..SIDE * SIDE)
        .map(|i| {
            let (x, y) = (i % SIDE, i / SIDE);
            if (x / 8 + y / 8) % 2 == 0 { 0x00_8A_6E_4B } else { 0x00_5C_45_2E }
        })
        .collect();
    Ok(RectImage::from_pixels(SIDE, SIDE, pixels)?)
}

fn striped_guard() -> RgbaImage {
    RgbaImage::from_fn(64, 32, |x, y| match (x / 8 % 2, y) {
        (_, 0..6) => Px([0xE0, 0xC0, 0xA0, 0xFF]),
        (0, _) => Px([0x20, 0x40, 0xB0, 0xFF]),
        _ => Px([0xD0, 0xD0, 0x30, 0xFF]),
    })
}

/*──────────────────────────── arena ──────────────────────────────────*/

fn arena_walls(image: &Arc<RectImage>) -> Vec<Rect3> {
    let h = ARENA / 2.0;
    let mut walls = vec![
        Rect3::wall((-h, -h), (h, -h), 0.0, WALL_HEIGHT),
        Rect3::wall((h, -h), (h, h), 0.0, WALL_HEIGHT),
        Rect3::wall((h, h), (-h, h), 0.0, WALL_HEIGHT),
        Rect3::wall((-h, h), (-h, -h), 0.0, WALL_HEIGHT),
    ];
    // a square pillar in the middle, one untextured face
    let p = 0.5;
    walls.push(Rect3::wall((-p, -p), (p, -p), 0.0, WALL_HEIGHT));
    walls.push(Rect3::wall((p, -p), (p, p), 0.0, WALL_HEIGHT));
    walls.push(Rect3::wall((p, p), (-p, p), 0.0, WALL_HEIGHT));
    for wall in &mut walls {
        wall.image = Some(image.clone());
    }
    walls.push(Rect3::wall((-p, p), (-p, -p), 0.0, WALL_HEIGHT));
    walls
}

struct Guard {
    body: Ellipsoid,
    heading: f32,
}

fn spawn_guards(pic: &Arc<EllipsoidPic>, count: usize) -> Vec<Guard> {
    (0..count)
        .map(|i| {
            let a = i as f32 / count.max(1) as f32 * TAU;
            let center = Vec3::new(2.5 * a.cos(), GUARD_RADIUS * 1.4, 2.5 * a.sin());
            Guard {
                body: Ellipsoid::new(center, pic.clone(), GUARD_RADIUS, GUARD_RADIUS * 1.4),
                heading: a + FRAC_PI_2,
            }
        })
        .collect()
}

fn step_guards(guards: &mut [Guard], dt: f32) {
    let limit = ARENA / 2.0 - GUARD_RADIUS;
    for g in guards.iter_mut() {
        let c = &mut g.body.center;
        c.x += g.heading.sin() * GUARD_SPEED * dt;
        c.z -= g.heading.cos() * GUARD_SPEED * dt;
        if c.x.abs() > limit || c.z.abs() > limit {
            c.x = c.x.clamp(-limit, limit);
            c.z = c.z.clamp(-limit, limit);
            g.heading += FRAC_PI_2 + 0.3;
        }
        let heading = g.heading;
        g.body.set_angle(heading);
    }

    for i in 0..guards.len() {
        let (head, tail) = guards.split_at_mut(i + 1);
        let a = &mut head[i].body;
        for b in tail.iter_mut().map(|g| &mut g.body) {
            let bump = a.bump_amount(b);
            if bump > 0.0 {
                Ellipsoid::move_apart(a, b, bump);
            }
        }
    }
}

/// Point every guard at the one shared picture.
fn share_pic(guards: &mut [Guard], pic: &Arc<EllipsoidPic>) {
    for g in guards {
        g.body.pic = Arc::clone(pic);
    }
}

/// Guard whose centre is closest to the view direction, if any is ahead.
fn guard_in_sight(cam: &Camera, guards: &[Guard]) -> Option<usize> {
    let forward = cam.forward();
    guards
        .iter()
        .enumerate()
        .filter_map(|(i, g)| {
            let to = (g.body.center - cam.location()).normalize_or_zero();
            let cos = to.dot(forward);
            (cos > 0.9).then_some((i, cos))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/*──────────────────────────── main ───────────────────────────────────*/

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let ctx = RenderContext::default();

    let wall_image = Arc::new(match &opts.wall_texture {
        Some(path) => RectImage::load(path)?,
        None => checker_wall()?,
    });
    let mut guard_pic = Arc::new(match &opts.ellipsoid_texture {
        Some(path) => ctx.load_ellipsoid_pic(path)?,
        None => ctx.ellipsoid_pic(striped_guard())?,
    });

    let walls = arena_walls(&wall_image);
    let mut guards = spawn_guards(&guard_pic, opts.guards);
    let mut bodies: Vec<Ellipsoid> = Vec::with_capacity(guards.len());
    info!("arena: {} walls, {} guards", walls.len(), guards.len());

    let (w, h) = (opts.width, opts.height);
    let view_h = if opts.split { h / 2 } else { h };

    let mut player = Camera::new(
        Vec3::new(0.0, EYE_HEIGHT, ARENA / 2.0 - 1.0),
        0.0,
        Viewport::new(w, view_h),
    );

    // corner view: horizon raised to fake looking down
    let mut overview_port = Viewport::new(w, view_h);
    overview_port.center_y = view_h as f32 * 0.25;
    let corner = ARENA / 2.0 - 0.2;
    let mut overview = Camera::new(Vec3::new(-corner, 2.5, -corner), 0.0, overview_port);

    let mut main_view = Software::new(&ctx);
    let mut corner_view = Software::new(&ctx);
    let mut frame = Surface::new(w, h);

    let mut win = Window::new("arena_render", w, h, WindowOptions::default())?;
    win.set_target_fps(60);

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();
    let mut last_tick = Instant::now();

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let dt = last_tick.elapsed().as_secs_f32().min(0.1);
        last_tick = Instant::now();
        let t0 = Instant::now();

        /* --------------- input ------------------------------------------ */
        let mut turn = 0.0;
        let mut forward = 0.0;
        let mut strafe = 0.0;
        if win.is_key_down(Key::Left) {
            turn -= 1.0;
        }
        if win.is_key_down(Key::Right) {
            turn += 1.0;
        }
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += 1.0;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= 1.0;
        }
        if win.is_key_down(Key::A) {
            strafe -= 1.0;
        }
        if win.is_key_down(Key::D) {
            strafe += 1.0;
        }

        player.set_angle(player.angle() + turn * TURN_SPEED * dt);
        let ahead = player.forward();
        let right = Vec3::new(-ahead.z, 0.0, ahead.x);
        let limit = ARENA / 2.0 - 0.3;
        let mut loc = player.location() + (ahead * forward + right * strafe) * MOVE_SPEED * dt;
        loc.x = loc.x.clamp(-limit, limit);
        loc.z = loc.z.clamp(-limit, limit);
        player.set_location(loc);
        player.update_caches();

        if win.is_key_pressed(Key::H, KeyRepeat::No) {
            let mut toggled = (*guard_pic).clone();
            toggled.hide_lower_half = !toggled.hide_lower_half;
            guard_pic = Arc::new(toggled);
            share_pic(&mut guards, &guard_pic);
        }

        /* --------------- simulation ------------------------------------- */
        step_guards(&mut guards, dt);
        let target = if win.is_key_down(Key::Space) {
            guard_in_sight(&player, &guards)
        } else {
            None
        };
        bodies.clear();
        bodies.extend(guards.iter().enumerate().map(|(i, g)| {
            let mut body = g.body.clone();
            body.highlighted = Some(i) == target;
            body
        }));

        /* --------------- draw ------------------------------------------- */
        let scene = Scene {
            rects: &walls,
            ellipsoids: &bodies,
        };

        if opts.split {
            overview.set_angle_towards(player.location());
            overview.update_caches();

            main_view.begin_frame(w, view_h);
            main_view.draw_scene(&scene, &player);
            corner_view.begin_frame(w, view_h);
            corner_view.draw_scene(&scene, &overview);

            frame.blit(main_view.surface(), 0, 0);
            frame.blit(corner_view.surface(), 0, view_h as i32);
            win.update_with_buffer(frame.pixels(), w, h)?;
        } else {
            let mut shown = Ok(());
            main_view.draw_frame(&scene, &player, |fb, w, h| {
                shown = win.update_with_buffer(fb, w, h);
            });
            shown?;
        }

        // ─────────── accumulate & report every ~3 s ────────────────────
        acc_time += t0.elapsed();
        acc_frames += 1;
        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames as f64;
            let stats = main_view.show_all().stats();
            info!(
                "avg frame: {avg_ms:.2} ms ({:.1} FPS), {} visible, {} edges, {} cycles broken",
                1000.0 / avg_ms,
                stats.visible,
                stats.edges,
                stats.cycles_broken
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}

/*=== Tests ===*/
#[cfg(test)]
mod tests {
    use super::*;
    use arena_render::world::AngleTable;

    #[test]
    fn guards_share_one_picture() {
        let angles = AngleTable::new(8);
        let pic = Arc::new(EllipsoidPic::from_image(&angles, striped_guard()).unwrap());
        let mut guards = spawn_guards(&pic, 5);

        let mut toggled = (*pic).clone();
        toggled.hide_lower_half = true;
        let toggled = Arc::new(toggled);
        share_pic(&mut guards, &toggled);

        assert!(guards.iter().all(|g| Arc::ptr_eq(&g.body.pic, &toggled)));
        assert!(guards.iter().all(|g| g.body.hide_lower_half()));
        // the guards plus `toggled` itself
        assert_eq!(Arc::strong_count(&toggled), 6);
        assert_eq!(Arc::strong_count(&pic), 1);
    }

    #[test]
    fn overlapping_guards_are_pushed_apart() {
        let angles = AngleTable::new(8);
        let pic = Arc::new(EllipsoidPic::from_image(&angles, striped_guard()).unwrap());
        let mut guards = spawn_guards(&pic, 2);
        guards[1].body.center = guards[0].body.center + Vec3::new(0.1, 0.0, 0.0);

        step_guards(&mut guards, 0.0);
        assert!(guards[0].body.bump_amount(&guards[1].body) < 1e-3);
    }
}
