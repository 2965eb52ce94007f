//! GLSL 450 sources for every pass.
//!
//! Mesh passes share the `SceneParams` block (see `gpu::uniforms::SceneUniforms`);
//! full-screen passes each bind their own small block at `set = 0, binding = 0`.
//! All texture coordinates use a top-left origin.

macro_rules! scene_params {
    () => {
        r"
#define MAX_LIGHTS 4

layout(std140, set = 0, binding = 0) uniform SceneParams {
    mat4 view;
    mat4 projection;
    mat4 model;
    mat4 cone_model;
    vec4 camera_position;
    vec4 light_position[MAX_LIGHTS];
    vec4 light_color[MAX_LIGHTS];
    vec4 cone_spot;
    vec4 params;
    vec4 target_size;
} scene;

float light_falloff(float dist, float cutoff, float decay) {
    if (decay > 0.0 && cutoff > 0.0) {
        return pow(clamp(1.0 - dist / cutoff, 0.0, 1.0), decay);
    }
    return 1.0;
}

vec3 vertex_lighting(vec3 world, float decay_modifier) {
    vec3 color = vec3(0.1);
    int count = min(int(scene.params.x), MAX_LIGHTS);
    for (int i = 0; i < MAX_LIGHTS; ++i) {
        if (i >= count) {
            break;
        }
        float dist = distance(scene.light_position[i].xyz, world);
        color += scene.light_color[i].rgb
            * light_falloff(dist, scene.light_position[i].w, scene.light_color[i].w * decay_modifier);
    }
    return color;
}
"
    };
}

macro_rules! fullscreen_io {
    () => {
        r"
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;
"
    };
}

/// Full-screen triangle; `v_uv` is (0, 0) at the top-left corner.
pub(crate) const FULLSCREEN_VERTEX: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 pos = positions[uint(gl_VertexIndex)];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

pub(crate) const MESH_VERTEX: &str = concat!(
    "#version 450\n",
    scene_params!(),
    r"
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec3 a_color;

layout(location = 0) out vec3 v_world;
layout(location = 1) out vec3 v_normal;
layout(location = 2) out vec3 v_color;

void main() {
    vec4 world = scene.model * vec4(a_position, 1.0);
    v_world = world.xyz;
    v_normal = mat3(scene.model) * a_normal;
    v_color = a_color;
    gl_Position = scene.projection * scene.view * world;
}
"
);

/// Lit model: ambient plus diffuse/specular from each point light.
pub(crate) const MESH_LIT_FRAGMENT: &str = concat!(
    "#version 450\n",
    scene_params!(),
    r"
layout(location = 0) in vec3 v_world;
layout(location = 1) in vec3 v_normal;
layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 out_color;
layout(location = 1) out float out_depth;

void main() {
    vec3 n = normalize(v_normal);
    vec3 view_dir = normalize(scene.camera_position.xyz - v_world);
    vec3 lit = v_color * 0.05;
    int count = min(int(scene.params.x), MAX_LIGHTS);
    for (int i = 0; i < MAX_LIGHTS; ++i) {
        if (i >= count) {
            break;
        }
        vec3 to_light = scene.light_position[i].xyz - v_world;
        float dist = length(to_light);
        vec3 l = to_light / max(dist, 0.0001);
        float diffuse = max(dot(n, l), 0.0);
        vec3 h = normalize(l + view_dir);
        float specular = pow(max(dot(n, h), 0.0), 32.0) * 0.25;
        float falloff = light_falloff(dist, scene.light_position[i].w, scene.light_color[i].w);
        lit += scene.light_color[i].rgb * falloff * (diffuse * v_color + vec3(specular));
    }
    out_color = vec4(lit, 1.0);
    out_depth = gl_FragCoord.z;
}
"
);

/// Occlusion silhouettes: the model blocks the light cone.
pub(crate) const MESH_BLACK_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec3 v_world;
layout(location = 1) in vec3 v_normal;
layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.0, 0.0, 0.0, 1.0);
}
";

pub(crate) const PARTICLE_VERTEX: &str = concat!(
    "#version 450\n",
    scene_params!(),
    r"
layout(location = 0) in vec3 a_center;

layout(location = 0) out vec3 v_color;

const vec2 corners[6] = vec2[6](
    vec2(-0.5, -0.5),
    vec2(0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, 0.5)
);

void main() {
    vec4 clip = scene.projection * scene.view * vec4(a_center, 1.0);
    vec2 corner = corners[uint(gl_VertexIndex)];
    clip.xy += corner * scene.params.y * 2.0 / scene.target_size.xy * clip.w;
    gl_Position = clip;
    v_color = vertex_lighting(a_center, scene.params.z);
}
"
);

pub(crate) const PARTICLE_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec3 v_color;

layout(location = 0) out vec4 out_color;
layout(location = 1) out float out_depth;

void main() {
    out_color = vec4(v_color, 1.0);
    out_depth = gl_FragCoord.z;
}
";

pub(crate) const CONE_VERTEX: &str = concat!(
    "#version 450\n",
    scene_params!(),
    r"
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec3 a_color;

layout(location = 0) out vec3 v_world;
layout(location = 1) out vec3 v_view_normal;
layout(location = 2) out vec3 v_color;

void main() {
    vec4 world = scene.cone_model * vec4(a_position, 1.0);
    v_world = world.xyz;
    v_view_normal = mat3(scene.view) * mat3(scene.cone_model) * a_normal;
    v_color = vertex_lighting(world.xyz, 1.0);
    gl_Position = scene.projection * scene.view * world;
}
"
);

/// Fades with distance from the spot and with grazing view angle.
pub(crate) const CONE_FRAGMENT: &str = concat!(
    "#version 450\n",
    scene_params!(),
    r"
layout(location = 0) in vec3 v_world;
layout(location = 1) in vec3 v_view_normal;
layout(location = 2) in vec3 v_color;

layout(location = 0) out vec4 out_color;

void main() {
    float intensity = distance(v_world, scene.cone_spot.xyz);
    intensity = 1.0 - clamp(intensity / scene.cone_spot.w, 0.0, 1.0);
    vec3 n = normalize(v_view_normal);
    n = vec3(n.x, n.y, abs(n.z));
    float angle = pow(max(dot(n, vec3(0.0, 0.0, 1.0)), 0.0), scene.params.w);
    out_color = vec4(v_color, intensity * angle);
}
"
);

/// Radial blur toward the projected light position.
pub(crate) const SCATTER_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
#define MAX_SAMPLES 100

layout(std140, set = 0, binding = 0) uniform ScatterParams {
    vec4 light;
    vec4 params;
} u;
layout(set = 0, binding = 1) uniform texture2D t_occlusion;
layout(set = 0, binding = 2) uniform sampler s_linear;

void main() {
    vec2 uv = v_uv;
    int samples = int(u.params.z);
    vec2 delta = (uv - u.light.xy) * (1.0 / float(max(samples, 1))) * u.params.x;
    vec4 color = textureLod(sampler2D(t_occlusion, s_linear), uv, 0.0);
    float illumination = 1.0;
    for (int i = 0; i < MAX_SAMPLES; ++i) {
        if (i >= samples) {
            break;
        }
        uv -= delta;
        vec4 tap = textureLod(sampler2D(t_occlusion, s_linear), uv, 0.0);
        color += tap * illumination * u.params.y;
        illumination *= u.light.w;
    }
    out_color = color * u.light.z;
}
"
);

pub(crate) const ADDITIVE_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
layout(set = 0, binding = 0) uniform texture2D t_base;
layout(set = 0, binding = 1) uniform texture2D t_add;
layout(set = 0, binding = 2) uniform sampler s_linear;

void main() {
    out_color = textureLod(sampler2D(t_base, s_linear), v_uv, 0.0)
        + textureLod(sampler2D(t_add, s_linear), v_uv, 0.0);
}
"
);

macro_rules! linear_depth {
    () => {
        r"
float linear_depth(float device_depth, float near, float far) {
    float view_z = -near * far / ((near - far) * device_depth + far);
    return clamp((view_z + near) / (near - far), 0.0, 1.0);
}
"
    };
}

/// Scan line sweeping through the depth range.
pub(crate) const SCAN_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
layout(std140, set = 0, binding = 0) uniform ScanParams {
    vec4 params;
} u;
layout(set = 0, binding = 1) uniform texture2D t_color;
layout(set = 0, binding = 2) uniform texture2D t_depth;
layout(set = 0, binding = 3) uniform sampler s_linear;
layout(set = 0, binding = 4) uniform sampler s_nearest;
",
    linear_depth!(),
    r"
void main() {
    vec4 color = textureLod(sampler2D(t_color, s_linear), v_uv, 0.0);
    float device_depth = textureLod(sampler2D(t_depth, s_nearest), v_uv, 0.0).r;
    float depth = linear_depth(device_depth, u.params.y, u.params.z);
    float scan = clamp(u.params.x, 0.0, 1.0);
    color.r += pow(1.0 - abs(depth - scan), 140.0) * (1.0 - pow(depth, 10.0));
    out_color = color;
}
"
);

/// Chromatic offset driven by the ripple canvas.
pub(crate) const RIPPLE_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
layout(std140, set = 0, binding = 0) uniform RippleParams {
    vec4 distort;
} u;
layout(set = 0, binding = 1) uniform texture2D t_color;
layout(set = 0, binding = 2) uniform texture2D t_ripple;
layout(set = 0, binding = 3) uniform sampler s_linear;
// Ripple texels hold a direction and strength; blending neighbours corrupts both.
layout(set = 0, binding = 4) uniform sampler s_nearest;

void main() {
    vec3 ripple = textureLod(sampler2D(t_ripple, s_nearest), v_uv, 0.0).rgb;
    vec2 towards = v_uv - ripple.xy;
    vec2 direction = towards / max(length(towards), 0.000001);
    vec2 offset = direction * ripple.b + u.distort.xy;
    out_color = vec4(
        ripple.b + textureLod(sampler2D(t_color, s_linear), v_uv + offset, 0.0).r,
        ripple.b + textureLod(sampler2D(t_color, s_linear), v_uv, 0.0).g,
        ripple.b + textureLod(sampler2D(t_color, s_linear), v_uv - offset, 0.0).b,
        1.0
    );
}
"
);

/// One glyph per cell, picked by depth and tinted by the cell colour.
pub(crate) const ASCII_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
layout(std140, set = 0, binding = 0) uniform AsciiParams {
    vec4 cells;
    vec4 glyphs;
    vec4 depth_range;
} u;
layout(set = 0, binding = 1) uniform texture2D t_color;
layout(set = 0, binding = 2) uniform texture2D t_depth;
layout(set = 0, binding = 3) uniform texture2D t_font;
layout(set = 0, binding = 4) uniform sampler s_nearest;
",
    linear_depth!(),
    r"
void main() {
    vec2 cell_count = u.cells.xy;
    vec2 cell_size = vec2(1.0) / cell_count;
    vec2 rounded_uv = floor(v_uv * cell_count) * cell_size;

    float device_depth = textureLod(sampler2D(t_depth, s_nearest), rounded_uv, 0.0).r;
    float depth = linear_depth(device_depth, u.depth_range.x, u.depth_range.y);
    vec4 color = textureLod(sampler2D(t_color, s_nearest), rounded_uv, 0.0);

    float columns = u.glyphs.x;
    float total = u.glyphs.z;
    vec2 glyph_size = vec2(1.0 / u.glyphs.x, 1.0 / u.glyphs.y);
    float index = min(floor(depth * total), total - 1.0);
    vec2 glyph_origin = vec2(mod(index, columns), floor(index / columns)) * glyph_size;
    vec2 within = mod(v_uv, cell_size) * cell_count;
    vec2 font_uv = glyph_origin + within * glyph_size;

    out_color = textureLod(sampler2D(t_font, s_nearest), font_uv, 0.0) * color;
}
"
);

/// Copies the final effect target to the surface.
pub(crate) const PRESENT_FRAGMENT: &str = concat!(
    "#version 450\n",
    fullscreen_io!(),
    r"
layout(set = 0, binding = 0) uniform texture2D t_color;
layout(set = 0, binding = 1) uniform sampler s_linear;

void main() {
    out_color = vec4(textureLod(sampler2D(t_color, s_linear), v_uv, 0.0).rgb, 1.0);
}
"
);

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::ShaderStage;

    fn parse(stage: ShaderStage, source: &str) -> wgpu::naga::Module {
        let mut frontend = Frontend::default();
        match frontend.parse(&Options::from(stage), source) {
            Ok(module) => module,
            Err(errors) => panic!("shader failed to parse: {errors:?}\n{source}"),
        }
    }

    fn binding_of(module: &wgpu::naga::Module, name: &str) -> Option<u32> {
        module
            .global_variables
            .iter()
            .find(|(_, global)| global.name.as_deref() == Some(name))
            .and_then(|(_, global)| global.binding.as_ref())
            .map(|binding| binding.binding)
    }

    #[test]
    fn vertex_shaders_parse() {
        for source in [FULLSCREEN_VERTEX, MESH_VERTEX, PARTICLE_VERTEX, CONE_VERTEX] {
            parse(ShaderStage::Vertex, source);
        }
    }

    #[test]
    fn fragment_shaders_parse() {
        for source in [
            MESH_LIT_FRAGMENT,
            MESH_BLACK_FRAGMENT,
            PARTICLE_FRAGMENT,
            CONE_FRAGMENT,
            SCATTER_FRAGMENT,
            ADDITIVE_FRAGMENT,
            SCAN_FRAGMENT,
            RIPPLE_FRAGMENT,
            ASCII_FRAGMENT,
            PRESENT_FRAGMENT,
        ] {
            parse(ShaderStage::Fragment, source);
        }
    }

    #[test]
    fn ripple_texture_is_point_sampled() {
        let module = parse(ShaderStage::Fragment, RIPPLE_FRAGMENT);
        assert_eq!(binding_of(&module, "t_ripple"), Some(2));
        assert_eq!(binding_of(&module, "s_linear"), Some(3));
        assert_eq!(binding_of(&module, "s_nearest"), Some(4));
        assert!(RIPPLE_FRAGMENT.contains("sampler2D(t_ripple, s_nearest)"));
        assert!(!RIPPLE_FRAGMENT.contains("sampler2D(t_ripple, s_linear)"));
    }

    #[test]
    fn shader_limits_match_config() {
        assert!(MESH_VERTEX.contains(&format!("#define MAX_LIGHTS {}", headerconfig::MAX_LIGHTS)));
        assert!(SCATTER_FRAGMENT.contains(&format!(
            "#define MAX_SAMPLES {}",
            headerconfig::MAX_SCATTER_SAMPLES
        )));
    }
}
