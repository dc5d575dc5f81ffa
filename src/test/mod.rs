mod builder;

pub use builder::*;

#[test]
fn builder_encodes_operations() {
    let data = MacroUnitBuilder::new(5)
        .line_offset(0x10)
        .define(300, "X")
        .define_strx(1, 2)
        .end()
        .build();

    assert_eq!(
        data,
        [
            0x05, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00, 0x01, 0xAC, 0x02, b'X', 0x00, 0x0B, 0x01,
            0x02, 0x00
        ]
    );
}

#[test]
fn builder_big_endian_table() {
    let data = MacroUnitBuilder::new(4)
        .big_endian()
        .offset_size_64()
        .vendor_op(0xE0, &[0x0F])
        .import(1)
        .build();

    assert_eq!(&data[..3], &[0x00, 0x04, 0x05]);
    assert_eq!(&data[3..7], &[0x01, 0xE0, 0x01, 0x0F]);
    assert_eq!(&data[7..], &[0x07, 0, 0, 0, 0, 0, 0, 0, 0x01]);
}
