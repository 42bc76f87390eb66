//! Core-command protocol.
//!
//! A message addressed to [`crate::name::CORE_SERVICE_NAME`] is not
//! enqueued; the kernel dispatches on the leading little-endian u32 of the
//! payload. Each command has a fixed-layout request body, and most
//! synthesize a typed response sent back from the core name. Field offsets
//! are byte-exact; there is no padding beyond what is written out
//! explicitly.

use alloc::string::String;
use alloc::vec::Vec;
use core::convert::TryInto;

use serde::{Deserialize, Serialize};

use crate::addr::{PhysAddr, VirtAddr};
use crate::message::WireError;
use crate::name::{NameError, ServiceName, SERVICE_NAME_FIELD_BYTES};

/// Request registry contents; response shares the tag
pub const COPY_SERVICES: u32 = 200;
/// Window-manager only: map the platform framebuffer
pub const MAP_FRAMEBUFFER: u32 = 201;
/// Sleep until a deadline
pub const SLEEP_MS: u32 = 202;
/// File-server only: map the boot ramdisk
pub const MAP_INITRD: u32 = 203;
/// Spawn a process from an in-memory image
pub const EXEC_BUFFER: u32 = 204;
/// Tear down a region created by `SHARED_MEMORY_CREATE`
pub const SHARED_MEMORY_DESTROY: u32 = 205;
/// Kernel memory usage counters
pub const SYSTEM_PROFILE: u32 = 206;
/// Sleep until a deadline or until a message arrives
pub const SLEEP_MS_OR_MESSAGE: u32 = 207;
/// Subscribe to a service's death; the synthesized death event shares the tag
pub const NOTIFY_ON_DEATH: u32 = 208;
pub const SERVICE_DIED: u32 = 208;
/// Drop all messages from the caller to a target
pub const FLUSH_MESSAGES: u32 = 209;
/// Map one physically-backed region into two address spaces
pub const SHARED_MEMORY_CREATE: u32 = 210;
/// Does a named service exist right now
pub const QUERY_SERVICE: u32 = 211;
/// Driver use: map a specific physical range
pub const MAP_PHYSICAL: u32 = 212;
/// Driver use: allocate and map contiguous physical memory
pub const ALLOC_PHYSICAL: u32 = 213;
/// Reverse of `ALLOC_PHYSICAL`
pub const FREE_PHYSICAL: u32 = 214;
/// Kernel to supervisor-parent only: child lifecycle event
pub const SUPERVISED_PROCESS_EVENT: u32 = 215;
/// Diagnostic response: an allocation inside a core command failed
pub const OUT_OF_MEMORY: u32 = 220;
/// Diagnostic response: restricted command from an unprivileged caller
pub const PERMISSION_DENIED: u32 = 221;

fn u8_at(input: &[u8], at: usize) -> Result<u8, WireError> {
    input.get(at).copied().ok_or(WireError::Truncated)
}

fn u32_at(input: &[u8], at: usize) -> Result<u32, WireError> {
    let bytes = input.get(at..at + 4).ok_or(WireError::Truncated)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn u64_at(input: &[u8], at: usize) -> Result<u64, WireError> {
    let bytes = input.get(at..at + 8).ok_or(WireError::Truncated)?;
    Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
}

fn name_at(input: &[u8], at: usize) -> Result<ServiceName, WireError> {
    let field = input
        .get(at..at + SERVICE_NAME_FIELD_BYTES)
        .ok_or(WireError::Truncated)?;
    ServiceName::from_field(field).map_err(WireError::BadName)
}

/// Reads a NUL-padded 64-byte string field that is not a service name
fn str_at(input: &[u8], at: usize) -> Result<String, WireError> {
    let field = input
        .get(at..at + SERVICE_NAME_FIELD_BYTES)
        .ok_or(WireError::Truncated)?;
    let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    core::str::from_utf8(&field[..len])
        .map(String::from)
        .map_err(|_| WireError::BadName(NameError::Invalid))
}

fn put_name(out: &mut Vec<u8>, name: &ServiceName) {
    let mut field = [0u8; SERVICE_NAME_FIELD_BYTES];
    name.write_field(&mut field);
    out.extend_from_slice(&field);
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    let mut field = [0u8; SERVICE_NAME_FIELD_BYTES];
    let len = s.len().min(SERVICE_NAME_FIELD_BYTES - 1);
    field[..len].copy_from_slice(&s.as_bytes()[..len]);
    out.extend_from_slice(&field);
}

/// `EXEC_BUFFER` request body:
///
/// ```text
/// 0   u32     tag
/// 4   [64]    program name, NUL-padded
/// 68  u8      1 = register the caller as the child's supervisor
/// 69  [3]     reserved, zero
/// 72  u64     image address in the caller's space
/// 80  u32     image size
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecBuffer {
    pub program_name: String,
    pub supervised: bool,
    pub image_base: VirtAddr,
    pub image_size: u32,
}

/// `SHARED_MEMORY_DESTROY` request body:
///
/// ```text
/// 0   u32     tag
/// 4   [64]    peer service name
/// 68  u32     region size
/// 72  u64     region base in the caller's space
/// 80  u64     region base in the peer's space
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryDestroy {
    pub peer: ServiceName,
    pub size: u32,
    pub local_base: VirtAddr,
    pub remote_base: VirtAddr,
}

/// A decoded core-command request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreCommand {
    CopyServices,
    MapFramebuffer,
    SleepMs(u32),
    MapInitrd,
    ExecBuffer(ExecBuffer),
    SharedMemoryDestroy(SharedMemoryDestroy),
    SystemProfile,
    SleepMsOrMessage(u32),
    NotifyOnDeath(ServiceName),
    FlushMessages(ServiceName),
    SharedMemoryCreate { peer: ServiceName, size: u32 },
    QueryService(ServiceName),
    MapPhysical { phys_base: PhysAddr, size: u64 },
    AllocPhysical { size: u64 },
    FreePhysical { virt_base: VirtAddr, size: u64 },
}
impl CoreCommand {
    pub fn tag(&self) -> u32 {
        match self {
            Self::CopyServices => COPY_SERVICES,
            Self::MapFramebuffer => MAP_FRAMEBUFFER,
            Self::SleepMs(_) => SLEEP_MS,
            Self::MapInitrd => MAP_INITRD,
            Self::ExecBuffer(_) => EXEC_BUFFER,
            Self::SharedMemoryDestroy(_) => SHARED_MEMORY_DESTROY,
            Self::SystemProfile => SYSTEM_PROFILE,
            Self::SleepMsOrMessage(_) => SLEEP_MS_OR_MESSAGE,
            Self::NotifyOnDeath(_) => NOTIFY_ON_DEATH,
            Self::FlushMessages(_) => FLUSH_MESSAGES,
            Self::SharedMemoryCreate { .. } => SHARED_MEMORY_CREATE,
            Self::QueryService(_) => QUERY_SERVICE,
            Self::MapPhysical { .. } => MAP_PHYSICAL,
            Self::AllocPhysical { .. } => ALLOC_PHYSICAL,
            Self::FreePhysical { .. } => FREE_PHYSICAL,
        }
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        let tag = u32_at(input, 0)?;
        Ok(match tag {
            COPY_SERVICES => Self::CopyServices,
            MAP_FRAMEBUFFER => Self::MapFramebuffer,
            SLEEP_MS => Self::SleepMs(u32_at(input, 4)?),
            MAP_INITRD => Self::MapInitrd,
            EXEC_BUFFER => Self::ExecBuffer(ExecBuffer {
                program_name: str_at(input, 4)?,
                supervised: u8_at(input, 68)? != 0,
                image_base: VirtAddr::new(u64_at(input, 72)?),
                image_size: u32_at(input, 80)?,
            }),
            SHARED_MEMORY_DESTROY => Self::SharedMemoryDestroy(SharedMemoryDestroy {
                peer: name_at(input, 4)?,
                size: u32_at(input, 68)?,
                local_base: VirtAddr::new(u64_at(input, 72)?),
                remote_base: VirtAddr::new(u64_at(input, 80)?),
            }),
            SYSTEM_PROFILE => Self::SystemProfile,
            SLEEP_MS_OR_MESSAGE => Self::SleepMsOrMessage(u32_at(input, 4)?),
            NOTIFY_ON_DEATH => Self::NotifyOnDeath(name_at(input, 4)?),
            FLUSH_MESSAGES => Self::FlushMessages(name_at(input, 4)?),
            SHARED_MEMORY_CREATE => Self::SharedMemoryCreate {
                peer: name_at(input, 4)?,
                size: u32_at(input, 68)?,
            },
            QUERY_SERVICE => Self::QueryService(name_at(input, 4)?),
            MAP_PHYSICAL => Self::MapPhysical {
                phys_base: PhysAddr::new(u64_at(input, 4)?),
                size: u64_at(input, 12)?,
            },
            ALLOC_PHYSICAL => Self::AllocPhysical {
                size: u64_at(input, 4)?,
            },
            FREE_PHYSICAL => Self::FreePhysical {
                virt_base: VirtAddr::new(u64_at(input, 4)?),
                size: u64_at(input, 12)?,
            },
            other => return Err(WireError::UnknownTag(other)),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.tag().to_le_bytes());
        match self {
            Self::CopyServices
            | Self::MapFramebuffer
            | Self::MapInitrd
            | Self::SystemProfile => {},
            Self::SleepMs(ms) | Self::SleepMsOrMessage(ms) => {
                out.extend_from_slice(&ms.to_le_bytes());
            },
            Self::ExecBuffer(cmd) => {
                put_str(&mut out, &cmd.program_name);
                out.push(cmd.supervised as u8);
                out.extend_from_slice(&[0; 3]);
                out.extend_from_slice(&cmd.image_base.as_u64().to_le_bytes());
                out.extend_from_slice(&cmd.image_size.to_le_bytes());
            },
            Self::SharedMemoryDestroy(cmd) => {
                put_name(&mut out, &cmd.peer);
                out.extend_from_slice(&cmd.size.to_le_bytes());
                out.extend_from_slice(&cmd.local_base.as_u64().to_le_bytes());
                out.extend_from_slice(&cmd.remote_base.as_u64().to_le_bytes());
            },
            Self::NotifyOnDeath(name) | Self::FlushMessages(name) | Self::QueryService(name) => {
                put_name(&mut out, name);
            },
            Self::SharedMemoryCreate { peer, size } => {
                put_name(&mut out, peer);
                out.extend_from_slice(&size.to_le_bytes());
            },
            Self::MapPhysical { phys_base, size } => {
                out.extend_from_slice(&phys_base.as_u64().to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
            },
            Self::AllocPhysical { size } => {
                out.extend_from_slice(&size.to_le_bytes());
            },
            Self::FreePhysical { virt_base, size } => {
                out.extend_from_slice(&virt_base.as_u64().to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
            },
        }
        out
    }
}

/// One entry of a `COPY_SERVICES` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub name: ServiceName,
    pub unread_count: u32,
}

/// `COPY_SERVICES` response: `[tag][count u32]` then `count` entries of
/// `[name 64][unread u32]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceListResponse {
    pub services: Vec<ServiceDescription>,
}
impl ServiceListResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&COPY_SERVICES.to_le_bytes());
        out.extend_from_slice(&(self.services.len() as u32).to_le_bytes());
        for desc in &self.services {
            put_name(&mut out, &desc.name);
            out.extend_from_slice(&desc.unread_count.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        let count = u32_at(input, 4)? as usize;
        let entry = SERVICE_NAME_FIELD_BYTES + 4;
        if input.len() < 8 + count * entry {
            return Err(WireError::Truncated);
        }
        let mut services = Vec::with_capacity(count);
        let mut at = 8;
        for _ in 0..count {
            services.push(ServiceDescription {
                name: name_at(input, at)?,
                unread_count: u32_at(input, at + SERVICE_NAME_FIELD_BYTES)?,
            });
            at += SERVICE_NAME_FIELD_BYTES + 4;
        }
        Ok(Self { services })
    }
}

/// `MAP_FRAMEBUFFER` response:
/// `[tag][kind u32][base u64][width u32][height u32][bits_per_pixel u32]`
/// `[bytes_per_pixel u32][pixels_per_scanline u32][size u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramebufferInfo {
    pub kind: u32,
    pub base: VirtAddr,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub bytes_per_pixel: u32,
    pub pixels_per_scanline: u32,
    pub size: u64,
}
impl FramebufferInfo {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAP_FRAMEBUFFER.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(&self.base.as_u64().to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.bits_per_pixel.to_le_bytes());
        out.extend_from_slice(&self.bytes_per_pixel.to_le_bytes());
        out.extend_from_slice(&self.pixels_per_scanline.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            kind: u32_at(input, 4)?,
            base: VirtAddr::new(u64_at(input, 8)?),
            width: u32_at(input, 16)?,
            height: u32_at(input, 20)?,
            bits_per_pixel: u32_at(input, 24)?,
            bytes_per_pixel: u32_at(input, 28)?,
            pixels_per_scanline: u32_at(input, 32)?,
            size: u64_at(input, 36)?,
        })
    }
}

/// `MAP_INITRD` response: `[tag][base u64][end u64][size u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitrdInfo {
    pub base: VirtAddr,
    pub end: VirtAddr,
    pub size: u64,
}
impl InitrdInfo {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAP_INITRD.to_le_bytes());
        out.extend_from_slice(&self.base.as_u64().to_le_bytes());
        out.extend_from_slice(&self.end.as_u64().to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            base: VirtAddr::new(u64_at(input, 4)?),
            end: VirtAddr::new(u64_at(input, 12)?),
            size: u64_at(input, 20)?,
        })
    }
}

/// `SYSTEM_PROFILE` response: `[tag][phys_allocated u64][heap_allocated u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProfileResponse {
    pub phys_allocated: u64,
    pub heap_allocated: u64,
}
impl SystemProfileResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SYSTEM_PROFILE.to_le_bytes());
        out.extend_from_slice(&self.phys_allocated.to_le_bytes());
        out.extend_from_slice(&self.heap_allocated.to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            phys_allocated: u64_at(input, 4)?,
            heap_allocated: u64_at(input, 12)?,
        })
    }
}

/// `SERVICE_DIED` event, kernel to subscriber: `[tag][dead name 64]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDied {
    pub dead: ServiceName,
}
impl ServiceDied {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SERVICE_DIED.to_le_bytes());
        put_name(&mut out, &self.dead);
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            dead: name_at(input, 4)?,
        })
    }
}

/// `SHARED_MEMORY_CREATE` response: `[tag][local u64][remote u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryCreateResponse {
    pub local_base: VirtAddr,
    pub remote_base: VirtAddr,
}
impl SharedMemoryCreateResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SHARED_MEMORY_CREATE.to_le_bytes());
        out.extend_from_slice(&self.local_base.as_u64().to_le_bytes());
        out.extend_from_slice(&self.remote_base.as_u64().to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            local_base: VirtAddr::new(u64_at(input, 4)?),
            remote_base: VirtAddr::new(u64_at(input, 12)?),
        })
    }
}

/// `SHARED_MEMORY_DESTROY` response: `[tag]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMemoryDestroyResponse;
impl SharedMemoryDestroyResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        SHARED_MEMORY_DESTROY.to_le_bytes().to_vec()
    }
}

/// `QUERY_SERVICE` response: `[tag][name 64][exists u8]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryServiceResponse {
    pub name: ServiceName,
    pub exists: bool,
}
impl QueryServiceResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&QUERY_SERVICE.to_le_bytes());
        put_name(&mut out, &self.name);
        out.push(self.exists as u8);
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            name: name_at(input, 4)?,
            exists: u8_at(input, 68)? != 0,
        })
    }
}

/// `MAP_PHYSICAL` response: `[tag][virt u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPhysicalResponse {
    pub virt_base: VirtAddr,
}
impl MapPhysicalResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAP_PHYSICAL.to_le_bytes());
        out.extend_from_slice(&self.virt_base.as_u64().to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            virt_base: VirtAddr::new(u64_at(input, 4)?),
        })
    }
}

/// `ALLOC_PHYSICAL` response: `[tag][phys u64][virt u64]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocPhysicalResponse {
    pub phys_base: PhysAddr,
    pub virt_base: VirtAddr,
}
impl AllocPhysicalResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&ALLOC_PHYSICAL.to_le_bytes());
        out.extend_from_slice(&self.phys_base.as_u64().to_le_bytes());
        out.extend_from_slice(&self.virt_base.as_u64().to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        Ok(Self {
            phys_base: PhysAddr::new(u64_at(input, 4)?),
            virt_base: VirtAddr::new(u64_at(input, 12)?),
        })
    }
}

/// `FREE_PHYSICAL` response: `[tag]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreePhysicalResponse;
impl FreePhysicalResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        FREE_PHYSICAL.to_le_bytes().to_vec()
    }
}

/// Maximum bytes carried by one supervised `Wrote` event
pub const SUPERVISED_WRITE_CHUNK: usize = 128;

/// Lifecycle event of a supervised child process.
///
/// Wire: `[tag][discriminant u32][fields]`, with discriminants
/// `Exited = 0`, `Wrote = 1`, `Created = 2`, `Started = 3`. `Wrote`
/// carries `[len u64][bytes 128]`, the others a single u64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupervisedProcessEvent {
    Exited { status: u64 },
    Wrote { data: Vec<u8> },
    Created { pid: u64 },
    Started { entry_point: u64 },
}
impl SupervisedProcessEvent {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SUPERVISED_PROCESS_EVENT.to_le_bytes());
        match self {
            Self::Exited { status } => {
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&status.to_le_bytes());
            },
            Self::Wrote { data } => {
                debug_assert!(data.len() <= SUPERVISED_WRITE_CHUNK);
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&(data.len() as u64).to_le_bytes());
                let mut field = [0u8; SUPERVISED_WRITE_CHUNK];
                field[..data.len()].copy_from_slice(data);
                out.extend_from_slice(&field);
            },
            Self::Created { pid } => {
                out.extend_from_slice(&2u32.to_le_bytes());
                out.extend_from_slice(&pid.to_le_bytes());
            },
            Self::Started { entry_point } => {
                out.extend_from_slice(&3u32.to_le_bytes());
                out.extend_from_slice(&entry_point.to_le_bytes());
            },
        }
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        match u32_at(input, 4)? {
            0 => Ok(Self::Exited {
                status: u64_at(input, 8)?,
            }),
            1 => {
                let len = (u64_at(input, 8)? as usize).min(SUPERVISED_WRITE_CHUNK);
                let field = input
                    .get(16..16 + SUPERVISED_WRITE_CHUNK)
                    .ok_or(WireError::Truncated)?;
                Ok(Self::Wrote {
                    data: field[..len].to_vec(),
                })
            },
            2 => Ok(Self::Created {
                pid: u64_at(input, 8)?,
            }),
            3 => Ok(Self::Started {
                entry_point: u64_at(input, 8)?,
            }),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

/// Diagnostic response for a failed core command:
/// `[event u32][failed request tag u32]` where event is
/// `OUT_OF_MEMORY` or `PERMISSION_DENIED`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreError {
    pub event: u32,
    pub request: u32,
}
impl CoreError {
    pub fn out_of_memory(request: u32) -> Self {
        Self {
            event: OUT_OF_MEMORY,
            request,
        }
    }

    pub fn permission_denied(request: u32) -> Self {
        Self {
            event: PERMISSION_DENIED,
            request,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.event.to_le_bytes());
        out.extend_from_slice(&self.request.to_le_bytes());
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        let event = u32_at(input, 0)?;
        if event != OUT_OF_MEMORY && event != PERMISSION_DENIED {
            return Err(WireError::UnknownTag(event));
        }
        Ok(Self {
            event,
            request: u32_at(input, 4)?,
        })
    }
}
