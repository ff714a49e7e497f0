fn main() {
    bacbo_monitor_lib::run()
}
