//! Host-side platform used by the bus tests: OS threads stand in for
//! processes, block/unblock is a mutex+condvar, and physical memory is a
//! table of byte vectors so shared mappings are observable.

use std::string::String;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex as StdMutex};
use std::thread::{self, ThreadId};
use std::vec::Vec;

use hashbrown::HashMap;

use nxabi::addr::page_align_up;
use nxabi::{PhysAddr, ProcessId, VirtAddr};
use nxtime::Instant;

use super::{
    AddressSpaces, BlockReason, BootEnv, Clock, Framebuffer, HeapStats, InitrdImage, MapError,
    ProcessControl, SpawnError,
};

pub const FRAMEBUFFER_PHYS: PhysAddr = PhysAddr::new(0x8000_0000);
pub const INITRD_PHYS: PhysAddr = PhysAddr::new(0x0900_0000);
pub const INITRD_CONTENTS: &[u8] = b"mock initrd image";

const FRAMEBUFFER_WIDTH: u32 = 640;
const FRAMEBUFFER_HEIGHT: u32 = 480;
const FRAMEBUFFER_SIZE: u64 = (FRAMEBUFFER_WIDTH * FRAMEBUFFER_HEIGHT * 4) as u64;

struct ProcState {
    blocked: BlockReason,
    /// Wakes delivered while runnable; cancel the next matching block
    pending: BlockReason,
}
impl ProcState {
    fn new() -> Self {
        Self {
            blocked: BlockReason::empty(),
            pending: BlockReason::empty(),
        }
    }
}

struct ProcTable {
    procs: HashMap<ProcessId, ProcState>,
    current: HashMap<ThreadId, ProcessId>,
    next_pid: u64,
    spawned: Vec<(String, Vec<u8>, ProcessId)>,
}

struct Region {
    base: u64,
    size: u64,
    phys: u64,
}

type PhysBacking = Arc<StdMutex<Vec<u8>>>;

struct SpaceTable {
    regions: HashMap<ProcessId, Vec<Region>>,
    phys: HashMap<u64, PhysBacking>,
    next_phys: u64,
    fail_allocs: bool,
}
impl SpaceTable {
    /// First free page-aligned base at or above the hint
    fn place(&self, pid: ProcessId, min_base: u64, size: u64) -> u64 {
        let mut base = min_base;
        if let Some(regions) = self.regions.get(&pid) {
            loop {
                let conflict = regions
                    .iter()
                    .find(|r| base < r.base + r.size && r.base < base + size);
                match conflict {
                    Some(conflict) => base = page_align_up(conflict.base + conflict.size),
                    None => break,
                }
            }
        }
        base
    }

    fn new_phys(&mut self, size: u64) -> u64 {
        let key = self.next_phys;
        self.next_phys += page_align_up(size).max(1);
        self.phys
            .insert(key, Arc::new(StdMutex::new(vec![0; size as usize])));
        key
    }

    fn region_of(&self, pid: ProcessId, base: u64, len: u64) -> Result<&Region, MapError> {
        self.regions
            .get(&pid)
            .and_then(|regions| {
                regions
                    .iter()
                    .find(|r| base >= r.base && base + len <= r.base + r.size)
            })
            .ok_or(MapError::NoSuchRange)
    }
}

pub struct MockPlatform {
    clock_ms: AtomicU64,
    procs: StdMutex<ProcTable>,
    wakeups: Condvar,
    spaces: StdMutex<SpaceTable>,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut phys: HashMap<u64, PhysBacking> = HashMap::new();
        phys.insert(
            FRAMEBUFFER_PHYS.as_u64(),
            Arc::new(StdMutex::new(vec![
                0;
                page_align_up(FRAMEBUFFER_SIZE) as usize
            ])),
        );
        let mut initrd = INITRD_CONTENTS.to_vec();
        initrd.resize(page_align_up(INITRD_CONTENTS.len() as u64) as usize, 0);
        phys.insert(INITRD_PHYS.as_u64(), Arc::new(StdMutex::new(initrd)));

        Self {
            clock_ms: AtomicU64::new(0),
            procs: StdMutex::new(ProcTable {
                procs: HashMap::new(),
                current: HashMap::new(),
                next_pid: 1,
                spawned: Vec::new(),
            }),
            wakeups: Condvar::new(),
            spaces: StdMutex::new(SpaceTable {
                regions: HashMap::new(),
                phys,
                next_phys: 0x1_0000_0000,
                fail_allocs: false,
            }),
        }
    }

    /// Creates a process with an empty address space
    pub fn add_process(&self) -> ProcessId {
        let pid = {
            let mut procs = self.procs.lock().unwrap();
            let pid = ProcessId::from_u64(procs.next_pid);
            procs.next_pid += 1;
            procs.procs.insert(pid, ProcState::new());
            pid
        };
        self.spaces
            .lock()
            .unwrap()
            .regions
            .insert(pid, Vec::new());
        pid
    }

    /// Makes the calling thread run in `pid`'s context
    pub fn enter(&self, pid: ProcessId) {
        self.procs
            .lock()
            .unwrap()
            .current
            .insert(thread::current().id(), pid);
    }

    pub fn advance_clock(&self, ms: u64) {
        self.clock_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn is_blocked(&self, pid: ProcessId) -> bool {
        !self.blocked_reasons(pid).is_empty()
    }

    pub fn set_fail_allocs(&self, fail: bool) {
        self.spaces.lock().unwrap().fail_allocs = fail;
    }

    pub fn spawned(&self) -> Vec<(String, Vec<u8>, ProcessId)> {
        self.procs.lock().unwrap().spawned.clone()
    }
}

impl Clock for MockPlatform {
    fn now(&self) -> Instant {
        Instant::from_millis(self.clock_ms.load(Ordering::SeqCst))
    }
}

impl ProcessControl for MockPlatform {
    fn current_process(&self) -> Option<ProcessId> {
        self.procs
            .lock()
            .unwrap()
            .current
            .get(&thread::current().id())
            .copied()
    }

    fn block(&self, pid: ProcessId, reasons: BlockReason) {
        let mut procs = self.procs.lock().unwrap();
        {
            let state = procs.procs.get_mut(&pid).expect("block: unknown pid");
            let latched = state.pending & reasons;
            if !latched.is_empty() {
                state.pending.remove(latched);
                return;
            }
            state.blocked = reasons;
        }
        loop {
            procs = self.wakeups.wait(procs).unwrap();
            if procs.procs.get(&pid).unwrap().blocked.is_empty() {
                return;
            }
        }
    }

    fn unblock(&self, pid: ProcessId, reason: BlockReason) {
        let mut procs = self.procs.lock().unwrap();
        let state = procs
            .procs
            .entry(pid)
            .or_insert_with(ProcState::new);
        if state.blocked.intersects(reason) {
            state.blocked = BlockReason::empty();
            self.wakeups.notify_all();
        } else {
            state.pending.insert(reason);
        }
    }

    fn blocked_reasons(&self, pid: ProcessId) -> BlockReason {
        self.procs
            .lock()
            .unwrap()
            .procs
            .get(&pid)
            .map(|state| state.blocked)
            .unwrap_or_else(BlockReason::empty)
    }

    fn spawn(&self, program_name: &str, image: Vec<u8>) -> Result<ProcessId, SpawnError> {
        if image.is_empty() {
            return Err(SpawnError::InvalidImage);
        }
        let pid = self.add_process();
        self.procs
            .lock()
            .unwrap()
            .spawned
            .push((String::from(program_name), image, pid));
        Ok(pid)
    }
}

impl AddressSpaces for MockPlatform {
    fn alloc_range(
        &self,
        pid: ProcessId,
        min_base: VirtAddr,
        size: u64,
    ) -> Result<VirtAddr, MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        if spaces.fail_allocs {
            return Err(MapError::OutOfMemory);
        }
        let phys = spaces.new_phys(size);
        let base = spaces.place(pid, min_base.as_u64(), size);
        spaces
            .regions
            .get_mut(&pid)
            .ok_or(MapError::NoSuchRange)?
            .push(Region { base, size, phys });
        Ok(VirtAddr::new(base))
    }

    fn map_range(
        &self,
        pid: ProcessId,
        min_base: VirtAddr,
        size: u64,
        phys: PhysAddr,
    ) -> Result<VirtAddr, MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        if spaces.fail_allocs {
            return Err(MapError::OutOfMemory);
        }
        spaces
            .phys
            .entry(phys.as_u64())
            .or_insert_with(|| Arc::new(StdMutex::new(vec![0; size as usize])));
        let base = spaces.place(pid, min_base.as_u64(), size);
        spaces
            .regions
            .get_mut(&pid)
            .ok_or(MapError::NoSuchRange)?
            .push(Region {
                base,
                size,
                phys: phys.as_u64(),
            });
        Ok(VirtAddr::new(base))
    }

    fn copy_phys_mapping(
        &self,
        dst: ProcessId,
        src: ProcessId,
        src_base: VirtAddr,
        size: u64,
        min_base: VirtAddr,
    ) -> Result<VirtAddr, MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        if spaces.fail_allocs {
            return Err(MapError::OutOfMemory);
        }
        let phys = spaces.region_of(src, src_base.as_u64(), size)?.phys;
        let base = spaces.place(dst, min_base.as_u64(), size);
        spaces
            .regions
            .get_mut(&dst)
            .ok_or(MapError::NoSuchRange)?
            .push(Region { base, size, phys });
        Ok(VirtAddr::new(base))
    }

    fn unmap_range(&self, pid: ProcessId, base: VirtAddr, size: u64) -> Result<(), MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        let regions = spaces.regions.get_mut(&pid).ok_or(MapError::NoSuchRange)?;
        let index = regions
            .iter()
            .position(|r| r.base == base.as_u64() && r.size >= size)
            .ok_or(MapError::NoSuchRange)?;
        regions.remove(index);
        Ok(())
    }

    fn free_range(&self, pid: ProcessId, base: VirtAddr, size: u64) -> Result<(), MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        let regions = spaces.regions.get_mut(&pid).ok_or(MapError::NoSuchRange)?;
        let index = regions
            .iter()
            .position(|r| r.base == base.as_u64() && r.size >= size)
            .ok_or(MapError::NoSuchRange)?;
        let region = regions.remove(index);
        spaces.phys.remove(&region.phys);
        Ok(())
    }

    fn alloc_phys_contiguous(&self, size: u64) -> Result<PhysAddr, MapError> {
        let mut spaces = self.spaces.lock().unwrap();
        if spaces.fail_allocs {
            return Err(MapError::OutOfMemory);
        }
        Ok(PhysAddr::new(spaces.new_phys(size)))
    }

    fn free_phys(&self, base: PhysAddr, _size: u64) -> Result<(), MapError> {
        self.spaces
            .lock()
            .unwrap()
            .phys
            .remove(&base.as_u64())
            .map(|_| ())
            .ok_or(MapError::NoSuchRange)
    }

    fn read_bytes(&self, pid: ProcessId, base: VirtAddr, buf: &mut [u8]) -> Result<(), MapError> {
        let spaces = self.spaces.lock().unwrap();
        let region = spaces.region_of(pid, base.as_u64(), buf.len() as u64)?;
        let backing = spaces.phys.get(&region.phys).ok_or(MapError::NoSuchRange)?;
        let backing = backing.lock().unwrap();
        let offset = (base.as_u64() - region.base) as usize;
        buf.copy_from_slice(&backing[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_bytes(&self, pid: ProcessId, base: VirtAddr, data: &[u8]) -> Result<(), MapError> {
        let spaces = self.spaces.lock().unwrap();
        let region = spaces.region_of(pid, base.as_u64(), data.len() as u64)?;
        let backing = spaces.phys.get(&region.phys).ok_or(MapError::NoSuchRange)?;
        let mut backing = backing.lock().unwrap();
        let offset = (base.as_u64() - region.base) as usize;
        backing[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

impl BootEnv for MockPlatform {
    fn framebuffer(&self) -> Framebuffer {
        Framebuffer {
            kind: 1,
            phys_base: FRAMEBUFFER_PHYS,
            width: FRAMEBUFFER_WIDTH,
            height: FRAMEBUFFER_HEIGHT,
            bits_per_pixel: 32,
            bytes_per_pixel: 4,
            pixels_per_scanline: FRAMEBUFFER_WIDTH,
            size: FRAMEBUFFER_SIZE,
        }
    }

    fn initrd(&self) -> InitrdImage {
        InitrdImage {
            phys_base: INITRD_PHYS,
            size: INITRD_CONTENTS.len() as u64,
        }
    }

    fn heap_stats(&self) -> HeapStats {
        HeapStats {
            phys_allocated: 0x40_0000,
            heap_allocated: 0x10_0000,
        }
    }
}
