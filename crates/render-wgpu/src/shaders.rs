/// WGSL shader for the streamed mesh: two directional lights, Blinn-Phong
/// specular, per-vertex albedo.
pub const SCENE_SHADER: &str = r#"
struct Uniforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    // x: 1.0 when the target is not sRGB and the shader must gamma-encode.
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) albedo: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) view_dir: vec3<f32>,
    @location(2) albedo: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let view = uniforms.view;
    let rotation = mat3x3<f32>(view[0].xyz, view[1].xyz, view[2].xyz);
    // Camera position in model space.
    let eye = -view[3].xyz * rotation;

    var out: VertexOutput;
    out.clip_position = uniforms.projection * view * vec4<f32>(vertex.position, 1.0);
    out.normal = vertex.normal;
    out.view_dir = normalize(eye - vertex.position);
    out.albedo = vertex.albedo;
    return out;
}

fn light(colour: vec3<f32>, l: vec3<f32>, n: vec3<f32>, v: vec3<f32>, albedo: vec3<f32>) -> vec3<f32> {
    let h = normalize(l + v);
    let diffuse = colour * max(dot(n, l), 0.0);
    let specular = colour * pow(max(dot(n, h), 0.0), 64.0);
    return albedo * diffuse + specular;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let v = normalize(in.view_dir);

    var rgb = vec3<f32>(0.0);
    rgb += light(vec3<f32>(1.0, 1.0, 1.0), normalize(vec3<f32>(0.5, 1.0, 0.0)), n, v, in.albedo.rgb);
    rgb += light(vec3<f32>(0.2, 0.2, 0.0), normalize(vec3<f32>(-0.5, -1.0, 0.0)), n, v, in.albedo.rgb);

    if uniforms.params.x > 0.5 {
        rgb = pow(rgb, vec3<f32>(1.0 / 2.2));
    }
    return vec4<f32>(rgb, in.albedo.a);
}
"#;
