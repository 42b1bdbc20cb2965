use binrw::{BinRead, BinResult, BinWrite};

use super::types::ConstantInfo;

/// Read `size - 1` pool slots. Long and double entries are followed by an
/// [`ConstantInfo::Unusable`] placeholder so pool indices stay 1:1 with
/// vector positions.
#[binrw::parser(reader, endian)]
pub fn read_const_pool(size: u16) -> BinResult<Vec<ConstantInfo>> {
    let slots = size.saturating_sub(1) as usize;
    let mut pool = Vec::with_capacity(slots);
    while pool.len() < slots {
        let constant = ConstantInfo::read_options(reader, endian, ())?;
        let wide = constant.is_wide();
        pool.push(constant);
        if wide {
            pool.push(ConstantInfo::Unusable);
        }
    }
    Ok(pool)
}

#[allow(clippy::ptr_arg)]
#[binrw::writer(writer, endian)]
pub fn write_const_pool(pool: &Vec<ConstantInfo>) -> BinResult<()> {
    for constant in pool {
        constant.write_options(writer, endian, ())?;
    }
    Ok(())
}
