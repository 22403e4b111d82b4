//! In-memory construction of small NE executables for tests.


pub(crate) const NE_HEADER_OFFSET: u32 = 0x40;
pub(crate) const RESOURCE_TABLE_OFFSET: u64 = 0x80;


pub(crate) enum TestId {
    Ordinal(u16),
    Named(&'static str),
}

pub(crate) struct TestResource {
    pub id: TestId,
    pub flags: u16,
    pub data: Vec<u8>,
}
impl TestResource {
    /// `raw_id` is stored as-is; it should have its top bit set.
    pub fn ordinal(raw_id: u16, data: Vec<u8>) -> Self {
        Self { id: TestId::Ordinal(raw_id), flags: 0x0030, data }
    }

    pub fn named(name: &'static str, data: Vec<u8>) -> Self {
        Self { id: TestId::Named(name), flags: 0x0030, data }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }
}

pub(crate) struct TestBlock {
    pub tag: u16,
    pub loader: u32,
    pub resources: Vec<TestResource>,
}
impl TestBlock {
    pub fn new(tag: u16) -> Self {
        Self { tag, loader: 0, resources: Vec::new() }
    }

    pub fn with_loader(mut self, loader: u32) -> Self {
        self.loader = loader;
        self
    }

    pub fn resource(mut self, resource: TestResource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// An NE executable consisting of headers, a resource table and resource data.
///
/// Layout: MZ header at 0, NE header at 0x40, resource table at 0x80 followed by the resource
/// names and a one-byte resident-name table, then the resource data aligned to the block size.
/// Resource data is padded to whole blocks.
pub(crate) struct TestImage {
    shift_count: u16,
    blocks: Vec<TestBlock>,
}
impl TestImage {
    pub fn new(shift_count: u16) -> Self {
        Self { shift_count, blocks: Vec::new() }
    }

    pub fn block(mut self, block: TestBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let block_size = 1usize << self.shift_count;
        let table_base = usize::try_from(RESOURCE_TABLE_OFFSET).unwrap();
        let ne_base = usize::try_from(NE_HEADER_OFFSET).unwrap();

        let table_len = 2
            + self.blocks.iter().map(|b| 8 + 12 * b.resources.len()).sum::<usize>()
            + 2;

        // resource names, relative to the table base
        let mut names = Vec::new();
        let mut raw_ids = Vec::new();
        for resource in self.blocks.iter().flat_map(|b| &b.resources) {
            match resource.id {
                TestId::Ordinal(raw_id) => raw_ids.push(raw_id),
                TestId::Named(name) => {
                    raw_ids.push(u16::try_from(table_len + names.len()).unwrap());
                    names.push(u8::try_from(name.len()).unwrap());
                    names.extend_from_slice(name.as_bytes());
                },
            }
        }

        let resident_name_table_pos = table_base + table_len + names.len();
        let data_start = (resident_name_table_pos + 1).next_multiple_of(block_size);

        // place the data
        let mut placements = Vec::new();
        let mut data_pos = data_start;
        for resource in self.blocks.iter().flat_map(|b| &b.resources) {
            let units = resource.data.len().div_ceil(block_size);
            placements.push((data_pos / block_size, units));
            data_pos += units * block_size;
        }

        let mut image = vec![0u8; data_pos.max(resident_name_table_pos + 1)];

        // MZ header
        image[0..2].copy_from_slice(b"MZ");
        image[0x02..0x04].copy_from_slice(&0x0090u16.to_le_bytes());
        image[0x04..0x06].copy_from_slice(&0x0003u16.to_le_bytes());
        image[0x08..0x0A].copy_from_slice(&0x0004u16.to_le_bytes());
        image[0x18..0x1A].copy_from_slice(&0x0040u16.to_le_bytes());
        image[0x3C..0x40].copy_from_slice(&NE_HEADER_OFFSET.to_le_bytes());

        // NE header
        let resource_table_rel = u16::try_from(table_base - ne_base).unwrap();
        let resident_rel = u16::try_from(resident_name_table_pos - ne_base).unwrap();
        image[ne_base..ne_base+2].copy_from_slice(b"NE");
        image[ne_base+0x02] = 5;
        image[ne_base+0x03] = 10;
        image[ne_base+0x0C..ne_base+0x0E].copy_from_slice(&0x0002u16.to_le_bytes());
        let table_offsets = [
            resource_table_rel, // segment table (empty)
            resource_table_rel,
            resident_rel,
            resident_rel + 1, // module-reference table (empty)
            resident_rel + 1, // imported-names table (empty)
        ];
        for (i, offset) in table_offsets.iter().enumerate() {
            let pos = ne_base + 0x22 + 2*i;
            image[pos..pos+2].copy_from_slice(&offset.to_le_bytes());
        }

        // resource table
        let mut table = Vec::with_capacity(table_len);
        table.extend_from_slice(&self.shift_count.to_le_bytes());
        let mut resource_index = 0;
        for block in &self.blocks {
            table.extend_from_slice(&block.tag.to_le_bytes());
            table.extend_from_slice(&u16::try_from(block.resources.len()).unwrap().to_le_bytes());
            table.extend_from_slice(&block.loader.to_le_bytes());
            for resource in &block.resources {
                let (offset_units, length_units) = placements[resource_index];
                table.extend_from_slice(&u16::try_from(offset_units).unwrap().to_le_bytes());
                table.extend_from_slice(&u16::try_from(length_units).unwrap().to_le_bytes());
                table.extend_from_slice(&resource.flags.to_le_bytes());
                table.extend_from_slice(&raw_ids[resource_index].to_le_bytes());
                table.extend_from_slice(&[0u8; 4]);

                let data_pos = offset_units * block_size;
                image[data_pos..data_pos+resource.data.len()].copy_from_slice(&resource.data);

                resource_index += 1;
            }
        }
        table.extend_from_slice(&0u16.to_le_bytes());
        table.extend_from_slice(&names);
        image[table_base..table_base+table.len()].copy_from_slice(&table);

        image
    }
}
