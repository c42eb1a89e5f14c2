fn main() {
    // 仅桌面外壳需要 Tauri 资源嵌入；无头构建（核心库 + 测试）跳过。
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
