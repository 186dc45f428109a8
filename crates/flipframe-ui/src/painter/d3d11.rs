//! Direct3D 11 egui painter.
//!
//! One dynamic vertex buffer and one dynamic index buffer hold every mesh of
//! the frame; each mesh is drawn with its own scissor rect and texture.

use std::collections::HashMap;
use std::ffi::c_void;

use anyhow::{Context, Result, anyhow};
use egui::epaint::{ImageDelta, Primitive, Vertex};
use egui::{TextureFilter, TextureId};
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::Fxc::D3DCompile;
use windows::Win32::Graphics::Direct3D::{D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST, ID3DBlob};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_R32_UINT, DXGI_FORMAT_R32G32_FLOAT, DXGI_SAMPLE_DESC,
};
use windows::core::{PCSTR, s};

use flipframe_engine::device::{DxgiBackend, DxgiDevice, DxgiTarget};

use super::{UiPainter, clip_to_scissor};
use crate::layer::UiFrame;

const SHADER: &str = r#"
cbuffer Screen : register(b0) {
    float2 screen_size;
    float2 padding;
};

struct VS_INPUT {
    float2 pos : POSITION;
    float2 uv : TEXCOORD0;
    float4 color : COLOR0;
};

struct PS_INPUT {
    float4 pos : SV_POSITION;
    float2 uv : TEXCOORD0;
    float4 color : COLOR0;
};

PS_INPUT vs_main(VS_INPUT input) {
    PS_INPUT output;
    output.pos = float4(
        2.0 * input.pos.x / screen_size.x - 1.0,
        1.0 - 2.0 * input.pos.y / screen_size.y,
        0.0,
        1.0);
    output.uv = input.uv;
    output.color = input.color;
    return output;
}

Texture2D tex : register(t0);
SamplerState samp : register(s0);

float4 ps_main(PS_INPUT input) : SV_TARGET {
    return input.color * tex.Sample(samp, input.uv);
}
"#;

/// Feature level 10_0 is the floor of the device ladder, so shader model 4.
const VS_PROFILE: PCSTR = s!("vs_4_0");
const PS_PROFILE: PCSTR = s!("ps_4_0");

/// D3D11 guarantees 8192 at 10_x and 16384 at 11_x.
const MAX_TEXTURE_SIDE: usize = 8192;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenConstants {
    screen_size: [f32; 2],
    padding: [f32; 2],
}

struct Pipeline {
    vertex_shader: ID3D11VertexShader,
    pixel_shader: ID3D11PixelShader,
    input_layout: ID3D11InputLayout,
    constants: ID3D11Buffer,
    blend: ID3D11BlendState,
    raster: ID3D11RasterizerState,
    linear: ID3D11SamplerState,
    nearest: ID3D11SamplerState,
}

struct GpuTexture {
    texture: ID3D11Texture2D,
    srv: ID3D11ShaderResourceView,
    filter: TextureFilter,
}

struct DynamicBuffer {
    buffer: ID3D11Buffer,
    capacity: usize,
}

/// egui renderer for the DXGI backend.
#[derive(Default)]
pub struct D3d11Painter {
    device: Option<ID3D11Device>,
    pipeline: Option<Pipeline>,
    vertices: Option<DynamicBuffer>,
    indices: Option<DynamicBuffer>,
    textures: HashMap<TextureId, GpuTexture>,
}

impl D3d11Painter {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_texture(&mut self, context: &ID3D11DeviceContext, id: TextureId, delta: &ImageDelta) -> Result<()> {
        let device = self.device.as_ref().ok_or_else(|| anyhow!("painter not attached"))?;

        #[allow(unreachable_patterns)]
        let (size, pixels): ([usize; 2], &[u8]) = match &delta.image {
            egui::ImageData::Color(image) => (image.size, bytemuck::cast_slice(&image.pixels)),
            _ => return Err(anyhow!("unsupported image data for texture {id:?}")),
        };
        let [width, height] = size;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let pitch = (width * 4) as u32;

        if let Some([x, y]) = delta.pos {
            let Some(existing) = self.textures.get(&id) else {
                return Err(anyhow!("partial update of unknown texture {id:?}"));
            };
            let region = D3D11_BOX {
                left: x as u32,
                top: y as u32,
                front: 0,
                right: (x + width) as u32,
                bottom: (y + height) as u32,
                back: 1,
            };
            unsafe {
                context.UpdateSubresource(
                    &existing.texture,
                    0,
                    Some(&region),
                    pixels.as_ptr() as *const c_void,
                    pitch,
                    0,
                );
            }
            return Ok(());
        }

        let desc = D3D11_TEXTURE2D_DESC {
            Width: width as u32,
            Height: height as u32,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_SHADER_RESOURCE.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let initial = D3D11_SUBRESOURCE_DATA {
            pSysMem: pixels.as_ptr() as *const c_void,
            SysMemPitch: pitch,
            SysMemSlicePitch: 0,
        };

        let mut texture = None;
        let mut srv = None;
        unsafe {
            device.CreateTexture2D(&desc, Some(&initial), Some(&mut texture as *mut _))?;
            let texture = texture.as_ref().ok_or_else(|| anyhow!("CreateTexture2D returned nothing"))?;
            device.CreateShaderResourceView(texture, None, Some(&mut srv as *mut _))?;
        }

        match (texture, srv) {
            (Some(texture), Some(srv)) => {
                self.textures.insert(
                    id,
                    GpuTexture {
                        texture,
                        srv,
                        filter: delta.options.magnification,
                    },
                );
                Ok(())
            }
            _ => Err(anyhow!("texture {id:?} creation returned nothing")),
        }
    }

    /// Grows `slot` to hold at least `needed` elements of `stride` bytes.
    fn ensure_buffer(
        device: &ID3D11Device,
        slot: &mut Option<DynamicBuffer>,
        needed: usize,
        stride: usize,
        bind: D3D11_BIND_FLAG,
    ) -> Result<()> {
        if slot.as_ref().is_some_and(|b| b.capacity >= needed) {
            return Ok(());
        }
        // headroom avoids reallocating while a window grows
        let capacity = needed.next_power_of_two().max(1024);
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: (capacity * stride) as u32,
            Usage: D3D11_USAGE_DYNAMIC,
            BindFlags: bind.0 as u32,
            CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let mut buffer = None;
        unsafe { device.CreateBuffer(&desc, None, Some(&mut buffer as *mut _))? };
        let buffer = buffer.ok_or_else(|| anyhow!("CreateBuffer returned nothing"))?;
        *slot = Some(DynamicBuffer { buffer, capacity });
        Ok(())
    }

    fn upload(&mut self, context: &ID3D11DeviceContext, frame: &UiFrame) -> Result<Vec<DrawCall>> {
        let device = self.device.as_ref().ok_or_else(|| anyhow!("painter not attached"))?;

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut draws = Vec::new();

        for clipped in &frame.primitives {
            let Primitive::Mesh(mesh) = &clipped.primitive else {
                // paint callbacks have no D3D11 counterpart
                continue;
            };
            if mesh.indices.is_empty() {
                continue;
            }
            draws.push(DrawCall {
                clip: clipped.clip_rect,
                texture: mesh.texture_id,
                first_index: indices.len() as u32,
                index_count: mesh.indices.len() as u32,
                base_vertex: vertices.len() as i32,
            });
            vertices.extend_from_slice(&mesh.vertices);
            indices.extend_from_slice(&mesh.indices);
        }

        if draws.is_empty() {
            return Ok(draws);
        }

        Self::ensure_buffer(
            device,
            &mut self.vertices,
            vertices.len(),
            size_of::<Vertex>(),
            D3D11_BIND_VERTEX_BUFFER,
        )?;
        Self::ensure_buffer(
            device,
            &mut self.indices,
            indices.len(),
            size_of::<u32>(),
            D3D11_BIND_INDEX_BUFFER,
        )?;

        let (Some(vb), Some(ib)) = (self.vertices.as_ref(), self.indices.as_ref()) else {
            return Err(anyhow!("geometry buffers missing"));
        };
        write_discard(context, &vb.buffer, bytemuck::cast_slice(&vertices))?;
        write_discard(context, &ib.buffer, bytemuck::cast_slice(&indices))?;

        Ok(draws)
    }
}

struct DrawCall {
    clip: egui::Rect,
    texture: TextureId,
    first_index: u32,
    index_count: u32,
    base_vertex: i32,
}

fn write_discard(context: &ID3D11DeviceContext, buffer: &ID3D11Buffer, bytes: &[u8]) -> Result<()> {
    unsafe {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        context.Map(buffer, 0, D3D11_MAP_WRITE_DISCARD, 0, Some(&mut mapped))?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.pData as *mut u8, bytes.len());
        context.Unmap(buffer, 0);
    }
    Ok(())
}

fn compile(entry: PCSTR, profile: PCSTR) -> Result<ID3DBlob> {
    let mut blob: Option<ID3DBlob> = None;
    let mut errors: Option<ID3DBlob> = None;
    let result = unsafe {
        D3DCompile(
            SHADER.as_ptr() as *const _,
            SHADER.len(),
            None,
            None,
            None,
            entry,
            profile,
            0,
            0,
            &mut blob,
            Some(&mut errors),
        )
    };
    if let Err(e) = result {
        let message = errors
            .map(|err| unsafe { String::from_utf8_lossy(blob_bytes(&err)).into_owned() })
            .unwrap_or_default();
        return Err(anyhow!("shader compilation failed: {e} {message}"));
    }
    blob.ok_or_else(|| anyhow!("D3DCompile returned no bytecode"))
}

/// # Safety
/// The blob must outlive the returned slice.
unsafe fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()) }
}

fn create_sampler(device: &ID3D11Device, filter: D3D11_FILTER) -> Result<ID3D11SamplerState> {
    let desc = D3D11_SAMPLER_DESC {
        Filter: filter,
        AddressU: D3D11_TEXTURE_ADDRESS_CLAMP,
        AddressV: D3D11_TEXTURE_ADDRESS_CLAMP,
        AddressW: D3D11_TEXTURE_ADDRESS_CLAMP,
        MipLODBias: 0.0,
        MaxAnisotropy: 1,
        ComparisonFunc: D3D11_COMPARISON_ALWAYS,
        BorderColor: [0.0; 4],
        MinLOD: 0.0,
        MaxLOD: 0.0,
    };
    let mut sampler = None;
    unsafe { device.CreateSamplerState(&desc, Some(&mut sampler as *mut _))? };
    sampler.ok_or_else(|| anyhow!("CreateSamplerState returned nothing"))
}

fn create_pipeline(device: &ID3D11Device) -> Result<Pipeline> {
    let vs_blob = compile(s!("vs_main"), VS_PROFILE).context("vertex shader")?;
    let ps_blob = compile(s!("ps_main"), PS_PROFILE).context("pixel shader")?;

    unsafe {
        let vs_bytes = blob_bytes(&vs_blob);
        let ps_bytes = blob_bytes(&ps_blob);

        let mut vertex_shader = None;
        device.CreateVertexShader(vs_bytes, None, Some(&mut vertex_shader as *mut _))?;
        let mut pixel_shader = None;
        device.CreatePixelShader(ps_bytes, None, Some(&mut pixel_shader as *mut _))?;

        // matches `epaint::Vertex`: pos, uv, premultiplied sRGBA8 color
        let layout = [
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("POSITION"),
                SemanticIndex: 0,
                Format: DXGI_FORMAT_R32G32_FLOAT,
                InputSlot: 0,
                AlignedByteOffset: 0,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            },
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("TEXCOORD"),
                SemanticIndex: 0,
                Format: DXGI_FORMAT_R32G32_FLOAT,
                InputSlot: 0,
                AlignedByteOffset: 8,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            },
            D3D11_INPUT_ELEMENT_DESC {
                SemanticName: s!("COLOR"),
                SemanticIndex: 0,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                InputSlot: 0,
                AlignedByteOffset: 16,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            },
        ];
        let mut input_layout = None;
        device.CreateInputLayout(&layout, vs_bytes, Some(&mut input_layout as *mut _))?;

        let cb_desc = D3D11_BUFFER_DESC {
            ByteWidth: size_of::<ScreenConstants>() as u32,
            Usage: D3D11_USAGE_DYNAMIC,
            BindFlags: D3D11_BIND_CONSTANT_BUFFER.0 as u32,
            CPUAccessFlags: D3D11_CPU_ACCESS_WRITE.0 as u32,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let mut constants = None;
        device.CreateBuffer(&cb_desc, None, Some(&mut constants as *mut _))?;

        // premultiplied alpha
        let blend_desc = D3D11_BLEND_DESC {
            AlphaToCoverageEnable: false.into(),
            IndependentBlendEnable: false.into(),
            RenderTarget: [
                D3D11_RENDER_TARGET_BLEND_DESC {
                    BlendEnable: true.into(),
                    SrcBlend: D3D11_BLEND_ONE,
                    DestBlend: D3D11_BLEND_INV_SRC_ALPHA,
                    BlendOp: D3D11_BLEND_OP_ADD,
                    SrcBlendAlpha: D3D11_BLEND_INV_DEST_ALPHA,
                    DestBlendAlpha: D3D11_BLEND_ONE,
                    BlendOpAlpha: D3D11_BLEND_OP_ADD,
                    RenderTargetWriteMask: D3D11_COLOR_WRITE_ENABLE_ALL.0 as u8,
                },
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
                D3D11_RENDER_TARGET_BLEND_DESC::default(),
            ],
        };
        let mut blend = None;
        device.CreateBlendState(&blend_desc, Some(&mut blend as *mut _))?;

        let raster_desc = D3D11_RASTERIZER_DESC {
            FillMode: D3D11_FILL_SOLID,
            CullMode: D3D11_CULL_NONE,
            FrontCounterClockwise: false.into(),
            DepthBias: 0,
            DepthBiasClamp: 0.0,
            SlopeScaledDepthBias: 0.0,
            DepthClipEnable: true.into(),
            ScissorEnable: true.into(),
            MultisampleEnable: false.into(),
            AntialiasedLineEnable: false.into(),
        };
        let mut raster = None;
        device.CreateRasterizerState(&raster_desc, Some(&mut raster as *mut _))?;

        Ok(Pipeline {
            vertex_shader: vertex_shader.ok_or_else(|| anyhow!("no vertex shader"))?,
            pixel_shader: pixel_shader.ok_or_else(|| anyhow!("no pixel shader"))?,
            input_layout: input_layout.ok_or_else(|| anyhow!("no input layout"))?,
            constants: constants.ok_or_else(|| anyhow!("no constant buffer"))?,
            blend: blend.ok_or_else(|| anyhow!("no blend state"))?,
            raster: raster.ok_or_else(|| anyhow!("no rasterizer state"))?,
            linear: create_sampler(device, D3D11_FILTER_MIN_MAG_MIP_LINEAR)?,
            nearest: create_sampler(device, D3D11_FILTER_MIN_MAG_MIP_POINT)?,
        })
    }
}

impl UiPainter<DxgiBackend> for D3d11Painter {
    fn attach(&mut self, device: &DxgiDevice) -> Result<()> {
        let pipeline = create_pipeline(&device.device).context("failed to create egui D3D11 pipeline")?;
        self.pipeline = Some(pipeline);
        self.device = Some(device.device.clone());
        log::debug!("egui D3D11 painter attached");
        Ok(())
    }

    fn detach(&mut self) {
        self.textures.clear();
        self.vertices = None;
        self.indices = None;
        self.pipeline = None;
        if self.device.take().is_some() {
            log::debug!("egui D3D11 painter detached");
        }
    }

    fn is_attached(&self) -> bool {
        self.pipeline.is_some()
    }

    fn max_texture_side(&self) -> usize {
        MAX_TEXTURE_SIDE
    }

    fn paint(&mut self, target: &mut DxgiTarget<'_>, frame: UiFrame) {
        if self.pipeline.is_none() {
            return;
        }
        let context = target.context;

        for (id, delta) in &frame.textures.set {
            if let Err(e) = self.update_texture(context, *id, delta) {
                log::warn!("texture update failed: {e:#}");
            }
        }

        let draws = match self.upload(context, &frame) {
            Ok(draws) => draws,
            Err(e) => {
                log::warn!("egui geometry upload failed: {e:#}");
                Vec::new()
            }
        };

        if let (Some(pipeline), Some(vb), Some(ib)) = (&self.pipeline, &self.vertices, &self.indices) {
            if !draws.is_empty() {
                let (width, height) = target.size;
                let ppp = frame.pixels_per_point.max(f32::EPSILON);
                let constants = ScreenConstants {
                    screen_size: [width as f32 / ppp, height as f32 / ppp],
                    padding: [0.0; 2],
                };
                if let Err(e) = write_discard(context, &pipeline.constants, bytemuck::bytes_of(&constants)) {
                    log::warn!("egui constants upload failed: {e}");
                }

                let stride = size_of::<Vertex>() as u32;
                let offset = 0u32;
                let viewport = D3D11_VIEWPORT {
                    TopLeftX: 0.0,
                    TopLeftY: 0.0,
                    Width: width as f32,
                    Height: height as f32,
                    MinDepth: 0.0,
                    MaxDepth: 1.0,
                };

                unsafe {
                    context.OMSetRenderTargets(Some(&[Some(target.rtv.clone())]), None);
                    context.OMSetBlendState(&pipeline.blend, Some(&[0.0; 4]), 0xffffffff);
                    context.RSSetState(&pipeline.raster);
                    context.RSSetViewports(Some(&[viewport]));
                    context.IASetInputLayout(&pipeline.input_layout);
                    context.IASetVertexBuffers(0, 1, Some(&Some(vb.buffer.clone())), Some(&stride), Some(&offset));
                    context.IASetIndexBuffer(&ib.buffer, DXGI_FORMAT_R32_UINT, 0);
                    context.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
                    context.VSSetShader(&pipeline.vertex_shader, None);
                    context.VSSetConstantBuffers(0, Some(&[Some(pipeline.constants.clone())]));
                    context.PSSetShader(&pipeline.pixel_shader, None);

                    for draw in &draws {
                        let Some(texture) = self.textures.get(&draw.texture) else { continue };
                        let Some((x, y, w, h)) = clip_to_scissor(draw.clip, ppp, [width, height]) else {
                            continue;
                        };
                        let sampler = match texture.filter {
                            TextureFilter::Nearest => &pipeline.nearest,
                            TextureFilter::Linear => &pipeline.linear,
                        };

                        context.RSSetScissorRects(Some(&[RECT {
                            left: x as i32,
                            top: y as i32,
                            right: (x + w) as i32,
                            bottom: (y + h) as i32,
                        }]));
                        context.PSSetShaderResources(0, Some(&[Some(texture.srv.clone())]));
                        context.PSSetSamplers(0, Some(&[Some(sampler.clone())]));
                        context.DrawIndexed(draw.index_count, draw.first_index, draw.base_vertex);
                    }
                }
            }
        }

        for id in &frame.textures.free {
            self.textures.remove(id);
        }
    }
}
