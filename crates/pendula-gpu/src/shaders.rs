//! WGSL compute kernels for the pendulum ensemble.
//!
//! Every kernel shares [`PRELUDE`]: the uniform block at binding 0 and
//! the cell index helper. Cells are `vec4<f32>` laid out as
//! `(p1, p2, phi1, phi2)`. Kernels run one invocation per cell with a
//! 2D dispatch so grids past 65535 workgroups still fit.

/// Uniform block and indexing shared by every kernel.
///
/// Must match `KernelParams` byte for byte (80 bytes).
pub const PRELUDE: &str = r#"
struct KernelParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
    mass1: f32,
    mass2: f32,
    length1: f32,
    length2: f32,
    gravity: f32,
    dt: f32,
    _pad2: f32,
    _pad3: f32,
    // Per-component Euler weights, (p1, p2, phi1, phi2).
    weights: vec4<f32>,
    // Angle window in radians: (min_phi1, max_phi1, min_phi2, max_phi2).
    angles: vec4<f32>,
}

@group(0) @binding(0) var<uniform> params: KernelParams;

fn cell_index(gid: vec3<u32>, groups: vec3<u32>) -> u32 {
    return gid.x + gid.y * groups.x * 256u;
}

fn cell_count() -> u32 {
    return params.width * params.height;
}
"#;

/// Reseed every cell at rest on the angle window's cell centres.
pub const SEED: &str = r#"
@group(0) @binding(1) var<storage, read_write> out_state: array<vec4<f32>>;

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let idx = cell_index(gid, groups);
    if (idx >= cell_count()) {
        return;
    }

    let col = idx % params.width;
    let row = idx / params.width;
    let s = (f32(col) + 0.5) / f32(params.width);
    let t = (f32(row) + 0.5) / f32(params.height);
    let a = params.angles;
    let phi1 = a.x + s * (a.y - a.x);
    let phi2 = a.z + t * (a.w - a.z);
    out_state[idx] = vec4<f32>(0.0, 0.0, phi1, phi2);
}
"#;

/// Hamilton's equations: `q_dot = (p1', p2', phi1', phi2')`.
pub const DERIVATIVE: &str = r#"
@group(0) @binding(1) var<storage, read> q_in: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> q_dot: array<vec4<f32>>;

fn hamiltonian_rhs(q: vec4<f32>) -> vec4<f32> {
    let p1 = q.x;
    let p2 = q.y;
    let phi1 = q.z;
    let phi2 = q.w;
    let m1 = params.mass1;
    let m2 = params.mass2;
    let l1 = params.length1;
    let l2 = params.length2;
    let g = params.gravity;

    let delta = phi1 - phi2;
    let m11 = (m1 + m2) * l1 * l1;
    let m12 = m2 * l1 * l2 * cos(delta);
    let m22 = m2 * l2 * l2;
    let det = m12 * m12 - m22 * m11;

    let dphi1 = (-m22 * p1 + m12 * p2) / det;
    let dphi2 = (m12 * p1 - m11 * p2) / det;

    let quad = m22 * p1 * p1 + m11 * p2 * p2 - 2.0 * m12 * p1 * p2;
    let dk = m2 * l1 * l2 * sin(delta) * ((p1 * p2) / (-det) - quad * m12 / (det * det));

    let dp1 = -dk - (m1 + m2) * g * l1 * sin(phi1);
    let dp2 = dk - m2 * g * l2 * sin(phi2);
    return vec4<f32>(dp1, dp2, dphi1, dphi2);
}

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let idx = cell_index(gid, groups);
    if (idx >= cell_count()) {
        return;
    }
    q_dot[idx] = hamiltonian_rhs(q_in[idx]);
}
"#;

/// Weighted Euler update: `out = q + dt * weights * q_dot`.
///
/// Covers RK4 stage states, forward Euler and splitting sub-steps.
pub const EULER: &str = r#"
@group(0) @binding(1) var<storage, read> q: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> q_dot: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> out_state: array<vec4<f32>>;

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let idx = cell_index(gid, groups);
    if (idx >= cell_count()) {
        return;
    }
    out_state[idx] = q[idx] + params.dt * params.weights * q_dot[idx];
}
"#;

/// RK4 combination: `out = q + dt/6 * (k1 + 2 k2 + 2 k3 + k4)`.
pub const RK4_COMBINE: &str = r#"
@group(0) @binding(1) var<storage, read> q: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> k1: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> k2: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read> k3: array<vec4<f32>>;
@group(0) @binding(5) var<storage, read> k4: array<vec4<f32>>;
@group(0) @binding(6) var<storage, read_write> out_state: array<vec4<f32>>;

@compute @workgroup_size(256)
fn main(
    @builtin(global_invocation_id) gid: vec3<u32>,
    @builtin(num_workgroups) groups: vec3<u32>,
) {
    let idx = cell_index(gid, groups);
    if (idx >= cell_count()) {
        return;
    }
    let slope = k1[idx] + 2.0 * k2[idx] + 2.0 * k3[idx] + k4[idx];
    out_state[idx] = q[idx] + (params.dt / 6.0) * slope;
}
"#;
