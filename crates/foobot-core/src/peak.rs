/// 运行期最大值
///
/// 不随时间衰减，也不会自动复位：展示的是"启动以来最差的读数"。
pub fn peak(new: f64, previous_peak: f64) -> f64 {
    if new > previous_peak {
        new
    } else {
        previous_peak
    }
}
