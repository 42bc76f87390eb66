//! Handlers for messages addressed to the reserved core name.
//!
//! These run in the calling process's context, dispatched straight from
//! the send path; the request is never enqueued. Recoverable failures are
//! answered with a diagnostic response event rather than an error status,
//! so the send itself still succeeds.

use alloc::sync::Arc;
use alloc::vec::Vec;

use nxabi::addr::{page_align_up, HIGH_MAPPING_BASE, SHARED_MEMORY_BASE};
use nxabi::cmd::{
    self, AllocPhysicalResponse, CoreCommand, CoreError, ExecBuffer, FramebufferInfo,
    FreePhysicalResponse, InitrdInfo, MapPhysicalResponse, QueryServiceResponse,
    ServiceDescription, ServiceListResponse, SharedMemoryCreateResponse, SharedMemoryDestroy,
    SharedMemoryDestroyResponse, SystemProfileResponse,
};
use nxabi::name::{
    AWM_SERVICE_NAME, FILE_SERVER_SERVICE_NAME, IDE_SERVICE_NAME, LINKER_SERVICE_NAME,
};
use nxabi::{PhysAddr, ServiceName, VirtAddr};

use super::result::{BusResult, Error};
use super::service::{Service, SharedRegion};
use super::Bus;
use crate::platform::Platform;

pub(super) fn handle<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    data: &[u8],
) -> BusResult<()> {
    let command = match CoreCommand::from_bytes(data) {
        Ok(command) => command,
        Err(e) => {
            log::warn!("undecodable core command from {}: {:?}", caller.name(), e);
            return Err(Error::MalformedRequest);
        },
    };
    log::trace!("core command {} from {}", command.tag(), caller.name());
    match command {
        CoreCommand::CopyServices => copy_services(bus, caller),
        CoreCommand::MapFramebuffer => map_framebuffer(bus, caller),
        CoreCommand::SleepMs(ms) => {
            bus.sleep(caller.pid(), ms, false);
            Ok(())
        },
        CoreCommand::MapInitrd => map_initrd(bus, caller),
        CoreCommand::ExecBuffer(request) => exec_buffer(bus, caller, request),
        CoreCommand::SharedMemoryDestroy(request) => shared_memory_destroy(bus, caller, request),
        CoreCommand::SystemProfile => system_profile(bus, caller),
        CoreCommand::SleepMsOrMessage(ms) => {
            bus.sleep(caller.pid(), ms, true);
            Ok(())
        },
        CoreCommand::NotifyOnDeath(target) => notify_on_death(bus, caller, target),
        CoreCommand::FlushMessages(target) => flush_messages(bus, caller, target),
        CoreCommand::SharedMemoryCreate { peer, size } => {
            shared_memory_create(bus, caller, peer, size)
        },
        CoreCommand::QueryService(name) => query_service(bus, caller, name),
        CoreCommand::MapPhysical { phys_base, size } => {
            map_physical(bus, caller, phys_base, size)
        },
        CoreCommand::AllocPhysical { size } => alloc_physical(bus, caller, size),
        CoreCommand::FreePhysical { virt_base, size } => {
            free_physical(bus, caller, virt_base, size)
        },
    }
}

fn respond<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>, body: Vec<u8>) -> BusResult<()> {
    bus.send_from_core(caller.name(), body).map(|_| ())
}

/// Answers an unprivileged caller with a diagnostic response.
/// Returns whether the caller is allowed to proceed.
fn check_privilege<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    allowed: &[&str],
    request: u32,
) -> BusResult<bool> {
    if allowed.iter().any(|name| caller.name().as_str() == *name) {
        return Ok(true);
    }
    log::warn!(
        "restricted core command {} from unprivileged {}",
        request,
        caller.name()
    );
    respond(bus, caller, CoreError::permission_denied(request).to_bytes())?;
    Ok(false)
}

fn copy_services<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>) -> BusResult<()> {
    let services = {
        let registry = bus.registry.lock();
        registry
            .iter()
            .map(|service| ServiceDescription {
                name: service.name().clone(),
                unread_count: service.lock().inbox.len() as u32,
            })
            .collect::<Vec<_>>()
    };
    respond(bus, caller, ServiceListResponse { services }.to_bytes())
}

fn map_framebuffer<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>) -> BusResult<()> {
    if !check_privilege(bus, caller, &[AWM_SERVICE_NAME], cmd::MAP_FRAMEBUFFER)? {
        return Ok(());
    }
    let fb = bus.platform.framebuffer();
    let mapped = bus.platform.map_range(
        caller.pid(),
        HIGH_MAPPING_BASE,
        page_align_up(fb.size),
        fb.phys_base,
    );
    match mapped {
        Ok(base) => {
            log::debug!("mapped framebuffer for {} at {:?}", caller.name(), base);
            let info = FramebufferInfo {
                kind: fb.kind,
                base,
                width: fb.width,
                height: fb.height,
                bits_per_pixel: fb.bits_per_pixel,
                bytes_per_pixel: fb.bytes_per_pixel,
                pixels_per_scanline: fb.pixels_per_scanline,
                size: fb.size,
            };
            respond(bus, caller, info.to_bytes())
        },
        Err(_) => respond(
            bus,
            caller,
            CoreError::out_of_memory(cmd::MAP_FRAMEBUFFER).to_bytes(),
        ),
    }
}

fn map_initrd<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>) -> BusResult<()> {
    if !check_privilege(bus, caller, &[FILE_SERVER_SERVICE_NAME], cmd::MAP_INITRD)? {
        return Ok(());
    }
    let rd = bus.platform.initrd();
    let mapped = bus.platform.map_range(
        caller.pid(),
        HIGH_MAPPING_BASE,
        page_align_up(rd.size),
        rd.phys_base,
    );
    match mapped {
        Ok(base) => {
            log::debug!("mapped initrd for {} at {:?}", caller.name(), base);
            let info = InitrdInfo {
                base,
                end: VirtAddr::new(base.as_u64() + rd.size),
                size: rd.size,
            };
            respond(bus, caller, info.to_bytes())
        },
        Err(_) => respond(
            bus,
            caller,
            CoreError::out_of_memory(cmd::MAP_INITRD).to_bytes(),
        ),
    }
}

fn exec_buffer<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    request: ExecBuffer,
) -> BusResult<()> {
    let allowed = [
        FILE_SERVER_SERVICE_NAME,
        LINKER_SERVICE_NAME,
        IDE_SERVICE_NAME,
    ];
    if !check_privilege(bus, caller, &allowed, cmd::EXEC_BUFFER)? {
        return Ok(());
    }
    // Copy the image into kernel memory before the caller can touch it
    let mut image = vec![0u8; request.image_size as usize];
    bus.platform
        .read_bytes(caller.pid(), request.image_base, &mut image)
        .map_err(Error::from)?;
    match bus.platform.spawn(&request.program_name, image) {
        Ok(child) => {
            log::debug!(
                "spawned {} as pid {} for {}",
                request.program_name,
                child,
                caller.name()
            );
            if request.supervised {
                bus.set_supervisor(child, caller.name().clone());
                bus.supervised_process_created(child);
            }
            Ok(())
        },
        Err(_) => respond(
            bus,
            caller,
            CoreError::out_of_memory(cmd::EXEC_BUFFER).to_bytes(),
        ),
    }
}

fn system_profile<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>) -> BusResult<()> {
    let stats = bus.platform.heap_stats();
    let response = SystemProfileResponse {
        phys_allocated: stats.phys_allocated,
        heap_allocated: stats.heap_allocated,
    };
    respond(bus, caller, response.to_bytes())
}

fn notify_on_death<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    target: ServiceName,
) -> BusResult<()> {
    let target_service = bus.registry.lock().by_name(&target);
    match target_service {
        Some(target_service) => {
            let mut inner = target_service.lock();
            if !inner.death_subscribers.contains(caller.name()) {
                inner.death_subscribers.push(caller.name().clone());
            }
            Ok(())
        },
        None => {
            log::debug!(
                "dropping death-notify request from {}: {} does not exist",
                caller.name(),
                target
            );
            Ok(())
        },
    }
}

fn flush_messages<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    target: ServiceName,
) -> BusResult<()> {
    let target_service = bus.registry.lock().by_name(&target);
    if let Some(target_service) = target_service {
        let flushed = target_service.lock().inbox.flush_from(caller.name());
        if flushed > 0 {
            log::debug!(
                "flushed {} messages from {} out of {}'s inbox",
                flushed,
                caller.name(),
                target
            );
        }
    }
    let flushed = bus.pending.lock().flush(caller.name(), &target);
    if flushed > 0 {
        log::debug!(
            "flushed {} messages from {} to {} out of the pending pool",
            flushed,
            caller.name(),
            target
        );
    }
    Ok(())
}

fn shared_memory_create<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    peer_name: ServiceName,
    size: u32,
) -> BusResult<()> {
    let peer = match bus.registry.lock().by_name(&peer_name) {
        Some(peer) => peer,
        None => {
            log::warn!(
                "shared memory request from {}: no such peer {}",
                caller.name(),
                peer_name
            );
            return Ok(());
        },
    };
    let size = page_align_up(u64::from(size));

    let local_base = match bus
        .platform
        .alloc_range(caller.pid(), SHARED_MEMORY_BASE, size)
    {
        Ok(base) => base,
        Err(_) => {
            return respond(
                bus,
                caller,
                CoreError::out_of_memory(cmd::SHARED_MEMORY_CREATE).to_bytes(),
            );
        },
    };
    let remote_base = match bus.platform.copy_phys_mapping(
        peer.pid(),
        caller.pid(),
        local_base,
        size,
        SHARED_MEMORY_BASE,
    ) {
        Ok(base) => base,
        Err(_) => {
            let _ = bus.platform.free_range(caller.pid(), local_base, size);
            return respond(
                bus,
                caller,
                CoreError::out_of_memory(cmd::SHARED_MEMORY_CREATE).to_bytes(),
            );
        },
    };

    caller.lock().shared_regions.push(SharedRegion {
        peer: peer.name().clone(),
        local_base,
        peer_base: remote_base,
        size,
    });
    peer.lock().shared_regions.push(SharedRegion {
        peer: caller.name().clone(),
        local_base: remote_base,
        peer_base: local_base,
        size,
    });

    log::debug!(
        "created shared memory {} <-> {} ({} bytes)",
        caller.name(),
        peer.name(),
        size
    );
    let response = SharedMemoryCreateResponse {
        local_base,
        remote_base,
    };
    respond(bus, caller, response.to_bytes())
}

fn shared_memory_destroy<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    request: SharedMemoryDestroy,
) -> BusResult<()> {
    // Only regions the bus itself set up may be torn down, so the request
    // is validated against the caller's records before any unmap
    let region = {
        let mut inner = caller.lock();
        let index = inner.shared_regions.iter().position(|r| {
            r.peer == request.peer
                && r.local_base == request.local_base
                && r.peer_base == request.remote_base
        });
        match index {
            Some(index) => inner.shared_regions.remove(index),
            None => return Err(Error::NoSuchRange),
        }
    };

    let peer = bus.registry.lock().by_name(&region.peer);
    if let Some(peer) = peer {
        peer.lock()
            .shared_regions
            .retain(|r| !(r.peer == *caller.name() && r.local_base == region.peer_base));
        if let Err(e) = bus
            .platform
            .unmap_range(peer.pid(), region.peer_base, region.size)
        {
            log::warn!("peer-side unmap for {} failed: {:?}", region.peer, e);
        }
    }
    // The physical backing is released only now, after both unmaps
    bus.platform
        .free_range(caller.pid(), region.local_base, region.size)
        .map_err(Error::from)?;
    respond(bus, caller, SharedMemoryDestroyResponse.to_bytes())
}

fn query_service<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    name: ServiceName,
) -> BusResult<()> {
    let exists = bus.registry.lock().by_name(&name).is_some();
    let response = QueryServiceResponse { name, exists };
    respond(bus, caller, response.to_bytes())
}

fn map_physical<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    phys_base: PhysAddr,
    size: u64,
) -> BusResult<()> {
    log::debug!(
        "{} mapping physical range {:?} + {:#x}",
        caller.name(),
        phys_base,
        size
    );
    let mapped = bus
        .platform
        .map_range(caller.pid(), HIGH_MAPPING_BASE, page_align_up(size), phys_base);
    match mapped {
        Ok(virt_base) => respond(bus, caller, MapPhysicalResponse { virt_base }.to_bytes()),
        Err(_) => respond(
            bus,
            caller,
            CoreError::out_of_memory(cmd::MAP_PHYSICAL).to_bytes(),
        ),
    }
}

fn alloc_physical<P: Platform>(bus: &Bus<P>, caller: &Arc<Service>, size: u64) -> BusResult<()> {
    let size = page_align_up(size);
    let phys_base = match bus.platform.alloc_phys_contiguous(size) {
        Ok(base) => base,
        Err(_) => {
            return respond(
                bus,
                caller,
                CoreError::out_of_memory(cmd::ALLOC_PHYSICAL).to_bytes(),
            );
        },
    };
    match bus
        .platform
        .map_range(caller.pid(), HIGH_MAPPING_BASE, size, phys_base)
    {
        Ok(virt_base) => {
            let response = AllocPhysicalResponse {
                phys_base,
                virt_base,
            };
            respond(bus, caller, response.to_bytes())
        },
        Err(_) => {
            let _ = bus.platform.free_phys(phys_base, size);
            respond(
                bus,
                caller,
                CoreError::out_of_memory(cmd::ALLOC_PHYSICAL).to_bytes(),
            )
        },
    }
}

fn free_physical<P: Platform>(
    bus: &Bus<P>,
    caller: &Arc<Service>,
    virt_base: VirtAddr,
    size: u64,
) -> BusResult<()> {
    bus.platform
        .free_range(caller.pid(), virt_base, page_align_up(size))
        .map_err(Error::from)?;
    respond(bus, caller, FreePhysicalResponse.to_bytes())
}
