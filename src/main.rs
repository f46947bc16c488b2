fn main() {
    natural_reminders::run()
}
