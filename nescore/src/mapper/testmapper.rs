use super::Mapper;

/// Claims the whole CPU address space as one flat 64KB PRG region, so CPU tests
/// can place code and data anywhere.
pub struct TestMapper;

impl Mapper for TestMapper {
    fn cpu_map_read(&self, addr: usize) -> Option<usize> {
        Some(addr & 0xFFFF)
    }

    fn cpu_map_write(&mut self, addr: usize) -> Option<usize> {
        Some(addr & 0xFFFF)
    }

    fn ppu_map_read(&self, addr: usize) -> Option<usize> {
        Some(addr & 0x1FFF)
    }

    fn ppu_map_write(&mut self, addr: usize) -> Option<usize> {
        Some(addr & 0x1FFF)
    }
}

impl TestMapper {
    pub fn new() -> Self {
        Self
    }
}
